use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::foundation::error::{PanelError, PanelResult};
use crate::foundation::raster::{RasterBuffer, Surface};
use crate::ports::cipher::{Cipher, TransformKind};

/// Runs the cipher directly on the calling thread.
///
/// This is the sole path on platforms without background execution, and the fallback used by
/// [`crate::OffloadDispatcher`] when the worker path fails. It never suspends. A cipher panic is
/// caught and reported as [`PanelError::Transform`], the same as on the worker path.
#[derive(Clone)]
pub struct SyncExecutor {
    cipher: Arc<dyn Cipher>,
}

impl std::fmt::Debug for SyncExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncExecutor").finish_non_exhaustive()
    }
}

impl SyncExecutor {
    /// Executor over `cipher`.
    pub fn new(cipher: Arc<dyn Cipher>) -> Self {
        Self { cipher }
    }

    /// Transform the caller-owned `surface` in place.
    ///
    /// The current surface contents are snapshotted as the cipher's source, so the cipher always
    /// reads a faithful copy while it writes.
    pub fn run(&self, kind: TransformKind, surface: &mut Surface) -> PanelResult<()> {
        let source = surface.read_raster();
        contain(|| self.cipher.transform(kind, surface, &source))
    }

    /// Transform an owned raster and return the result.
    pub fn run_raster(&self, kind: TransformKind, raster: RasterBuffer) -> PanelResult<RasterBuffer> {
        transform_raster(self.cipher.as_ref(), kind, &raster)
    }
}

/// Paint `raster` onto a fresh surface, run the cipher, read the surface back.
pub(crate) fn transform_raster(
    cipher: &dyn Cipher,
    kind: TransformKind,
    raster: &RasterBuffer,
) -> PanelResult<RasterBuffer> {
    raster.validate()?;
    let mut surface = Surface::new(raster.width, raster.height);
    surface.paint(raster)?;
    contain(|| cipher.transform(kind, &mut surface, raster))?;
    Ok(surface.into_raster())
}

/// Run a cipher call, turning a panic into a transform error.
fn contain(run: impl FnOnce() -> PanelResult<()>) -> PanelResult<()> {
    catch_unwind(AssertUnwindSafe(run)).unwrap_or_else(|panic| {
        Err(PanelError::transform(format!(
            "cipher panicked: {}",
            panic_message(&*panic)
        )))
    })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/offload/sync_exec.rs"]
mod tests;
