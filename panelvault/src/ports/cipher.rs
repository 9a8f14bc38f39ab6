use crate::foundation::error::PanelResult;
use crate::foundation::raster::{RasterBuffer, Surface};

/// Direction of the reversible pixel transform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    /// Scramble a clear raster for storage/transit.
    Encrypt,
    /// Restore a scrambled raster for presentation.
    Decrypt,
}

impl TransformKind {
    /// Wire name (`"encrypt"` / `"decrypt"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
        }
    }
}

impl std::fmt::Display for TransformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally supplied reversible pixel transform.
///
/// Contract:
/// - pure pixel operation, no IO;
/// - paints the transformed `source` into `surface` (same dimensions as `source`);
/// - `Decrypt` after `Encrypt` with the same dimensions restores the original pixels;
/// - deterministic for a given `(kind, dimensions)`.
///
/// Implementations report internal failure by returning [`crate::PanelError::Transform`].
pub trait Cipher: Send + Sync {
    /// Apply `kind` to `source`, writing the result into `surface`.
    fn transform(
        &self,
        kind: TransformKind,
        surface: &mut Surface,
        source: &RasterBuffer,
    ) -> PanelResult<()>;
}
