#![allow(dead_code)]

use panelvault::{Codec, ImageCodec, PanelResult, RasterBuffer, WireFormat};

pub const FAKE_JXL_MAGIC: &[u8; 4] = b"FJXL";

/// Stand-in for a JPEG XL decoder: raw RGBA behind a magic and two little-endian dimensions.
/// Every other payload and all encoding go through [`ImageCodec`].
pub struct FakeJxlCodec;

pub fn fake_jxl(raster: &RasterBuffer) -> Vec<u8> {
    let mut out = FAKE_JXL_MAGIC.to_vec();
    out.extend_from_slice(&raster.width.to_le_bytes());
    out.extend_from_slice(&raster.height.to_le_bytes());
    out.extend_from_slice(&raster.pixels);
    out
}

impl Codec for FakeJxlCodec {
    fn decode(&self, bytes: &[u8]) -> PanelResult<RasterBuffer> {
        match bytes.strip_prefix(FAKE_JXL_MAGIC) {
            Some(rest) if rest.len() >= 8 => {
                let w = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]);
                let h = u32::from_le_bytes([rest[4], rest[5], rest[6], rest[7]]);
                RasterBuffer::new(w, h, rest[8..].to_vec())
            }
            _ => ImageCodec::new().decode(bytes),
        }
    }

    fn encode(&self, raster: &RasterBuffer, format: WireFormat, quality: u8) -> PanelResult<Vec<u8>> {
        ImageCodec::new().encode(raster, format, quality)
    }

    fn can_encode(&self, format: WireFormat) -> bool {
        ImageCodec::new().can_encode(format)
    }
}

/// Deterministic, visibly non-uniform page.
pub fn page(width: u32, height: u32, seed: u8) -> RasterBuffer {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&[
                (x as u8).wrapping_mul(7).wrapping_add(seed),
                (y as u8).wrapping_mul(11),
                seed,
                255,
            ]);
        }
    }
    RasterBuffer { width, height, pixels }
}
