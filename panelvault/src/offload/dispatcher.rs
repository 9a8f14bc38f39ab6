use std::sync::Arc;

use crate::foundation::error::{PanelError, PanelResult};
use crate::foundation::raster::RasterBuffer;
use crate::offload::protocol::{RequestId, TransformRequest};
use crate::offload::sync_exec::SyncExecutor;
use crate::offload::worker::WorkerContext;
use crate::ports::cipher::{Cipher, TransformKind};

/// Options for the background execution context.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OffloadOpts {
    /// Try the background path at all. `false` behaves like a platform without threads.
    pub enabled: bool,
    /// Name given to the worker thread.
    pub thread_name: String,
}

impl Default for OffloadOpts {
    fn default() -> Self {
        Self {
            enabled: true,
            thread_name: "panelvault-offload".to_string(),
        }
    }
}

/// Lifecycle of the dispatcher's worker slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    /// No submission yet; the capability probe has not run.
    Unprobed,
    /// The worker context is up.
    Ready,
    /// Construction failed or the worker died; every submission runs synchronously.
    Unavailable,
    /// [`OffloadDispatcher::dispose`] ran.
    Disposed,
}

/// Counters that make degradation observable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Transforms answered by the worker.
    pub offloaded: u64,
    /// Worker attempts that failed and were retried synchronously.
    pub fallbacks: u64,
    /// Transforms that went straight to the synchronous path (worker unavailable).
    pub synchronous: u64,
}

enum WorkerSlot {
    Unprobed,
    Ready(WorkerContext),
    Unavailable,
    Disposed,
}

/// Moves the cipher off the caller's thread, with a synchronous fallback.
///
/// One dispatcher owns at most one worker context, built lazily on first use. The capability
/// probe runs once: if the context cannot be constructed the dispatcher stays synchronous for
/// its whole lifetime.
///
/// [`submit`](Self::submit) takes `&mut self`, so a caller cannot have two requests in flight on
/// the same context.
pub struct OffloadDispatcher {
    sync: SyncExecutor,
    worker_cipher: Arc<dyn Cipher>,
    opts: OffloadOpts,
    slot: WorkerSlot,
    next_id: u64,
    stats: DispatchStats,
}

impl std::fmt::Debug for OffloadDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffloadDispatcher")
            .field("opts", &self.opts)
            .field("state", &self.state())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl OffloadDispatcher {
    /// Dispatcher running `cipher` on both the worker and the fallback path.
    pub fn new(cipher: Arc<dyn Cipher>, opts: OffloadOpts) -> Self {
        Self {
            sync: SyncExecutor::new(cipher.clone()),
            worker_cipher: cipher,
            opts,
            slot: WorkerSlot::Unprobed,
            next_id: 0,
            stats: DispatchStats::default(),
        }
    }

    /// Dispatcher for a platform without background execution: every submission runs on the
    /// caller's thread.
    pub fn synchronous_only(cipher: Arc<dyn Cipher>) -> Self {
        let mut this = Self::new(
            cipher,
            OffloadOpts {
                enabled: false,
                ..OffloadOpts::default()
            },
        );
        this.slot = WorkerSlot::Unavailable;
        this
    }

    /// Use a separate cipher instance on the worker side.
    ///
    /// Must be called before the first submission.
    pub fn with_worker_cipher(mut self, cipher: Arc<dyn Cipher>) -> Self {
        self.worker_cipher = cipher;
        self
    }

    /// Current worker slot state.
    pub fn state(&self) -> WorkerState {
        match self.slot {
            WorkerSlot::Unprobed => WorkerState::Unprobed,
            WorkerSlot::Ready(_) => WorkerState::Ready,
            WorkerSlot::Unavailable => WorkerState::Unavailable,
            WorkerSlot::Disposed => WorkerState::Disposed,
        }
    }

    /// Snapshot of the dispatch counters.
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Run `kind` over `raster`, preferring the worker.
    ///
    /// Worker failure, unavailability or a broken channel falls back to the synchronous path
    /// with identical inputs; the degradation is logged and counted but not returned. Only a
    /// synchronous-path failure is returned, and it is terminal for this request.
    #[tracing::instrument(skip(self, raster), fields(width = raster.width, height = raster.height))]
    pub async fn submit(
        &mut self,
        kind: TransformKind,
        raster: RasterBuffer,
    ) -> PanelResult<RasterBuffer> {
        let id = self.fresh_id();
        let Some(worker) = self.worker() else {
            self.stats.synchronous += 1;
            return self.sync.run_raster(kind, raster);
        };

        // The worker consumes its copy; the original stays here for the fallback.
        let request = TransformRequest::new(id, kind, raster.clone());
        match worker.round_trip(request).await {
            Ok(out) => {
                self.stats.offloaded += 1;
                Ok(out)
            }
            Err(err) => {
                tracing::warn!(%id, error = %err, "offloaded transform failed; retrying synchronously");
                if matches!(err, PanelError::WorkerUnavailable(_)) {
                    self.slot = WorkerSlot::Unavailable;
                }
                self.stats.fallbacks += 1;
                self.sync.run_raster(kind, raster)
            }
        }
    }

    /// Tear down the worker context. Late results are never delivered after this returns;
    /// later submissions run synchronously.
    pub fn dispose(&mut self) {
        if let WorkerSlot::Ready(mut ctx) = std::mem::replace(&mut self.slot, WorkerSlot::Disposed)
        {
            ctx.terminate();
            tracing::debug!("offload worker disposed");
        }
    }

    fn fresh_id(&mut self) -> RequestId {
        self.next_id = self.next_id.wrapping_add(1);
        RequestId(self.next_id)
    }

    fn worker(&mut self) -> Option<&mut WorkerContext> {
        if matches!(self.slot, WorkerSlot::Unprobed) {
            self.slot = self.probe();
        }
        match &mut self.slot {
            WorkerSlot::Ready(ctx) => Some(ctx),
            _ => None,
        }
    }

    fn probe(&self) -> WorkerSlot {
        if !self.opts.enabled {
            tracing::debug!("background execution disabled; using synchronous transforms");
            return WorkerSlot::Unavailable;
        }
        match WorkerContext::spawn(self.worker_cipher.clone(), &self.opts.thread_name) {
            Ok(ctx) => WorkerSlot::Ready(ctx),
            Err(e) => {
                tracing::warn!(error = %e, "offload worker unavailable; using synchronous transforms");
                WorkerSlot::Unavailable
            }
        }
    }
}

impl Drop for OffloadDispatcher {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/offload/dispatcher.rs"]
mod tests;
