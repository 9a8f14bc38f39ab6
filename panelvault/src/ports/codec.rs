use image::ImageEncoder as _;

use crate::foundation::error::{PanelError, PanelResult};
use crate::foundation::raster::RasterBuffer;

/// Compressed byte encodings used in transit or storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Windows bitmap.
    Bmp,
    /// JPEG.
    Jpeg,
    /// PNG.
    Png,
    /// WebP.
    Webp,
    /// AVIF.
    Avif,
    /// GIF.
    Gif,
    /// JPEG XL.
    Jxl,
}

impl WireFormat {
    /// All known formats.
    pub const ALL: [WireFormat; 7] = [
        WireFormat::Bmp,
        WireFormat::Jpeg,
        WireFormat::Png,
        WireFormat::Webp,
        WireFormat::Avif,
        WireFormat::Gif,
        WireFormat::Jxl,
    ];

    /// Canonical MIME type.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Bmp => "image/bmp",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Avif => "image/avif",
            Self::Gif => "image/gif",
            Self::Jxl => "image/jxl",
        }
    }

    /// Canonical file extension (no dot).
    pub fn extension(self) -> &'static str {
        match self {
            Self::Bmp => "bmp",
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Avif => "avif",
            Self::Gif => "gif",
            Self::Jxl => "jxl",
        }
    }

    /// Parse a MIME essence such as `image/webp` (case-insensitive, no parameters).
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.mime().eq_ignore_ascii_case(mime))
            .or_else(|| mime.eq_ignore_ascii_case("image/jpg").then_some(Self::Jpeg))
    }

    /// Parse a file extension (with or without the leading dot, case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "bmp" => Some(Self::Bmp),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            "avif" => Some(Self::Avif),
            "gif" => Some(Self::Gif),
            "jxl" => Some(Self::Jxl),
            _ => None,
        }
    }
}

impl std::fmt::Display for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Low-level wire codec, consumed through a narrow port.
pub trait Codec: Send + Sync {
    /// Decode wire bytes to a straight-alpha RGBA8 raster.
    fn decode(&self, bytes: &[u8]) -> PanelResult<RasterBuffer>;

    /// Encode a raster to `format`. `quality` is 1..=100 and only honoured by lossy encoders.
    fn encode(&self, raster: &RasterBuffer, format: WireFormat, quality: u8) -> PanelResult<Vec<u8>>;

    /// Whether [`Codec::encode`] supports `format`.
    fn can_encode(&self, format: WireFormat) -> bool;
}

/// [`Codec`] backed by the `image` crate.
///
/// Decodes every format `image` was built with. Encodes PNG, JPEG (quality honoured), lossless
/// WebP and BMP. JPEG XL is not handled here; plug a JXL-capable codec into the port instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageCodec;

impl ImageCodec {
    /// Construct the codec.
    pub fn new() -> Self {
        Self
    }
}

impl Codec for ImageCodec {
    fn decode(&self, bytes: &[u8]) -> PanelResult<RasterBuffer> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| PanelError::codec(format!("decode image from memory: {e}")))?;
        Ok(RasterBuffer::from_rgba_image(img.to_rgba8()))
    }

    fn encode(&self, raster: &RasterBuffer, format: WireFormat, quality: u8) -> PanelResult<Vec<u8>> {
        raster.validate()?;
        let (w, h) = (raster.width, raster.height);
        let mut out = Vec::new();
        let res = match format {
            WireFormat::Png => image::codecs::png::PngEncoder::new(&mut out).write_image(
                &raster.pixels,
                w,
                h,
                image::ExtendedColorType::Rgba8,
            ),
            WireFormat::Webp => image::codecs::webp::WebPEncoder::new_lossless(&mut out)
                .write_image(&raster.pixels, w, h, image::ExtendedColorType::Rgba8),
            WireFormat::Bmp => image::codecs::bmp::BmpEncoder::new(&mut out).write_image(
                &raster.pixels,
                w,
                h,
                image::ExtendedColorType::Rgba8,
            ),
            WireFormat::Jpeg => {
                // JPEG has no alpha channel.
                let rgb = image::DynamicImage::ImageRgba8(raster.clone().into_rgba_image()?)
                    .to_rgb8();
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
                    .write_image(rgb.as_raw(), w, h, image::ExtendedColorType::Rgb8)
            }
            WireFormat::Avif | WireFormat::Gif | WireFormat::Jxl => {
                return Err(PanelError::codec(format!(
                    "encoding to {format} is not supported by ImageCodec"
                )));
            }
        };
        res.map_err(|e| PanelError::codec(format!("encode {format}: {e}")))?;
        Ok(out)
    }

    fn can_encode(&self, format: WireFormat) -> bool {
        matches!(
            format,
            WireFormat::Png | WireFormat::Webp | WireFormat::Bmp | WireFormat::Jpeg
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/ports/codec.rs"]
mod tests;
