use crate::foundation::error::{PanelError, PanelResult};

/// Decoded pixel data with explicit dimensions, independent of any wire encoding.
///
/// Pixels are straight-alpha RGBA8, tightly packed, row-major. A buffer is exclusively owned by
/// whichever component currently operates on it; hand-offs move it.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RasterBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA8 bytes (`width * height * 4`).
    pub pixels: Vec<u8>,
}

impl RasterBuffer {
    /// Build a raster, validating that `pixels` matches `width * height * 4`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> PanelResult<Self> {
        let expected = byte_len(width, height)?;
        if pixels.len() != expected {
            return Err(PanelError::validation(format!(
                "raster {width}x{height} expects {expected} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A raster filled with a single RGBA8 color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let px = (width as usize).saturating_mul(height as usize);
        let mut pixels = Vec::with_capacity(px.saturating_mul(4));
        for _ in 0..px {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Check the buffer invariants (used on values that crossed a serde or thread boundary).
    pub fn validate(&self) -> PanelResult<()> {
        let expected = byte_len(self.width, self.height)?;
        if self.pixels.len() != expected {
            return Err(PanelError::validation(format!(
                "raster {}x{} expects {expected} bytes, got {}",
                self.width,
                self.height,
                self.pixels.len()
            )));
        }
        Ok(())
    }

    /// `true` when the raster holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// RGBA8 value at `(x, y)`, if in bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.pixels.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub(crate) fn into_rgba_image(self) -> PanelResult<image::RgbaImage> {
        let (w, h) = (self.width, self.height);
        image::RgbaImage::from_raw(w, h, self.pixels)
            .ok_or_else(|| PanelError::validation(format!("raster {w}x{h} has a short buffer")))
    }

    pub(crate) fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }
}

fn byte_len(width: u32, height: u32) -> PanelResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(4))
        .ok_or_else(|| PanelError::validation(format!("raster {width}x{height} is too large")))
}

/// Axis-aligned pixel rectangle used for surface copies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Construct a rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn fits_within(self, width: u32, height: u32) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(height)
    }
}

/// Owned RGBA8 drawing surface sized to a page's natural dimensions.
///
/// This is the render target a cipher paints into and the renderer finally presents. It is never
/// shared: the component operating on it holds it by value or `&mut`.
#[derive(Clone, Debug)]
pub struct Surface {
    image: image::RgbaImage,
    renderable: bool,
}

impl Surface {
    /// Transparent surface of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: image::RgbaImage::new(width, height),
            renderable: false,
        }
    }

    /// Surface sized to `raster` with its pixels painted in.
    pub fn from_raster(raster: RasterBuffer) -> PanelResult<Self> {
        Ok(Self {
            image: raster.into_rgba_image()?,
            renderable: false,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Paint `raster` at the origin. The raster must fit inside the surface.
    pub fn paint(&mut self, raster: &RasterBuffer) -> PanelResult<()> {
        raster.validate()?;
        self.copy_rect(
            raster,
            PixelRect::new(0, 0, raster.width, raster.height),
            0,
            0,
        )
    }

    /// Copy `src_rect` of `source` onto this surface with its top-left corner at `(dst_x, dst_y)`.
    pub fn copy_rect(
        &mut self,
        source: &RasterBuffer,
        src_rect: PixelRect,
        dst_x: u32,
        dst_y: u32,
    ) -> PanelResult<()> {
        if !src_rect.fits_within(source.width, source.height) {
            return Err(PanelError::validation(format!(
                "source rect {src_rect:?} exceeds raster {}x{}",
                source.width, source.height
            )));
        }
        let dst_rect = PixelRect::new(dst_x, dst_y, src_rect.width, src_rect.height);
        if !dst_rect.fits_within(self.width(), self.height()) {
            return Err(PanelError::validation(format!(
                "destination rect {dst_rect:?} exceeds surface {}x{}",
                self.width(),
                self.height()
            )));
        }

        let src_stride = source.width as usize * 4;
        let dst_stride = self.width() as usize * 4;
        let row_bytes = src_rect.width as usize * 4;
        let dst: &mut [u8] = &mut self.image;
        for row in 0..src_rect.height as usize {
            let s = (src_rect.y as usize + row) * src_stride + src_rect.x as usize * 4;
            let d = (dst_y as usize + row) * dst_stride + dst_x as usize * 4;
            dst[d..d + row_bytes].copy_from_slice(&source.pixels[s..s + row_bytes]);
        }
        Ok(())
    }

    /// Read the full surface back into a raster.
    pub fn read_raster(&self) -> RasterBuffer {
        RasterBuffer::from_rgba_image(self.image.clone())
    }

    /// Consume the surface, returning its pixels as a raster.
    pub fn into_raster(self) -> RasterBuffer {
        RasterBuffer::from_rgba_image(self.image)
    }

    /// Flag the surface as ready for presentation.
    pub fn mark_renderable(&mut self) {
        self.renderable = true;
    }

    /// Whether the surface has been handed over for presentation.
    pub fn is_renderable(&self) -> bool {
        self.renderable
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/raster.rs"]
mod tests;
