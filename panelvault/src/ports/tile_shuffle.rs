use crate::foundation::error::{PanelError, PanelResult};
use crate::foundation::math::{Fnv1a64, SplitMix64};
use crate::foundation::raster::{PixelRect, RasterBuffer, Surface};
use crate::ports::cipher::{Cipher, TransformKind};

/// Default tile edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 16;

/// Reference [`Cipher`]: a reversible permutation of fixed-size tiles.
///
/// The permutation is keyed only by the page dimensions and tile size, so a page scrambled on
/// upload can be restored by any reader that knows its natural size. Pixels of partial tiles on
/// the right/bottom edges pass through unchanged.
#[derive(Clone, Copy, Debug)]
pub struct TileShuffleCipher {
    tile: u32,
}

impl Default for TileShuffleCipher {
    fn default() -> Self {
        Self {
            tile: DEFAULT_TILE_SIZE,
        }
    }
}

impl TileShuffleCipher {
    /// Cipher with a custom tile edge (must be non-zero).
    pub fn new(tile: u32) -> PanelResult<Self> {
        if tile == 0 {
            return Err(PanelError::validation("tile size must be non-zero"));
        }
        Ok(Self { tile })
    }

    /// Tile edge in pixels.
    pub fn tile_size(&self) -> u32 {
        self.tile
    }

    fn permutation(&self, width: u32, height: u32, cols: u32, rows: u32) -> Vec<usize> {
        let n = (cols as usize) * (rows as usize);
        let mut hash = Fnv1a64::new_default();
        hash.write_u32(width);
        hash.write_u32(height);
        hash.write_u32(self.tile);
        let mut rng = SplitMix64::new(hash.finish());

        let mut perm: Vec<usize> = (0..n).collect();
        for i in (1..n).rev() {
            let j = rng.next_index(i + 1);
            perm.swap(i, j);
        }
        perm
    }

    fn tile_rect(&self, index: usize, cols: u32) -> PixelRect {
        let col = (index % cols as usize) as u32;
        let row = (index / cols as usize) as u32;
        PixelRect::new(col * self.tile, row * self.tile, self.tile, self.tile)
    }
}

impl Cipher for TileShuffleCipher {
    fn transform(
        &self,
        kind: TransformKind,
        surface: &mut Surface,
        source: &RasterBuffer,
    ) -> PanelResult<()> {
        source
            .validate()
            .map_err(|e| PanelError::transform(e.to_string()))?;
        if surface.width() != source.width || surface.height() != source.height {
            return Err(PanelError::transform(format!(
                "surface {}x{} does not match source {}x{}",
                surface.width(),
                surface.height(),
                source.width,
                source.height
            )));
        }

        // Edges first; full tiles are overwritten below.
        surface.paint(source)?;

        let cols = source.width / self.tile;
        let rows = source.height / self.tile;
        if cols == 0 || rows == 0 {
            return Ok(());
        }

        let perm = self.permutation(source.width, source.height, cols, rows);
        for (i, &p) in perm.iter().enumerate() {
            let (from, to) = match kind {
                TransformKind::Encrypt => (i, p),
                TransformKind::Decrypt => (p, i),
            };
            let src = self.tile_rect(from, cols);
            let dst = self.tile_rect(to, cols);
            surface.copy_rect(source, src, dst.x, dst.y)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/ports/tile_shuffle.rs"]
mod tests;
