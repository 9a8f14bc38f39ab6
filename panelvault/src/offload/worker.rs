use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use crate::foundation::error::{PanelError, PanelResult};
use crate::foundation::raster::RasterBuffer;
use crate::offload::protocol::{TransformRequest, TransformResult, handle_request};
use crate::ports::cipher::Cipher;

/// One background execution context: a dedicated thread plus a private capacity-1
/// request/result channel pair. Owned by exactly one dispatcher.
pub(crate) struct WorkerContext {
    requests: Option<mpsc::Sender<TransformRequest>>,
    results: Option<mpsc::Receiver<TransformResult>>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerContext {
    pub(crate) fn spawn(cipher: Arc<dyn Cipher>, thread_name: &str) -> std::io::Result<Self> {
        let (req_tx, req_rx) = mpsc::channel::<TransformRequest>(1);
        let (res_tx, res_rx) = mpsc::channel::<TransformResult>(1);

        let thread = std::thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || worker_loop(cipher, req_rx, res_tx))?;

        Ok(Self {
            requests: Some(req_tx),
            results: Some(res_rx),
            thread: Some(thread),
        })
    }

    /// Send one request and wait for the result carrying the same id.
    ///
    /// Results with any other id belong to submissions whose caller stopped waiting; they are
    /// dropped here so each id is delivered at most once.
    pub(crate) async fn round_trip(
        &mut self,
        request: TransformRequest,
    ) -> PanelResult<RasterBuffer> {
        let id = request.id;
        let (Some(requests), Some(results)) = (self.requests.as_ref(), self.results.as_mut())
        else {
            return Err(PanelError::worker_unavailable("worker context terminated"));
        };

        requests
            .send(request)
            .await
            .map_err(|_| PanelError::worker_unavailable("worker request channel closed"))?;

        loop {
            let Some(result) = results.recv().await else {
                return Err(PanelError::worker_unavailable(
                    "worker exited before answering",
                ));
            };
            if result.id != id {
                tracing::debug!(stale = %result.id, expected = %id, "dropping late transform result");
                continue;
            }
            return result.into_result();
        }
    }

    /// Stop listening, then close the request channel so the thread exits after its current job.
    ///
    /// Queued requests are discarded: once the listener is gone the worker's next result send
    /// fails and the loop drops its receiver. The thread is not joined.
    pub(crate) fn terminate(&mut self) {
        drop(self.results.take());
        drop(self.requests.take());
        drop(self.thread.take());
    }
}

impl Drop for WorkerContext {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn worker_loop(
    cipher: Arc<dyn Cipher>,
    mut requests: mpsc::Receiver<TransformRequest>,
    results: mpsc::Sender<TransformResult>,
) {
    tracing::debug!("offload worker started");
    while let Some(request) = requests.blocking_recv() {
        let result = handle_request(cipher.as_ref(), request);
        if results.blocking_send(result).is_err() {
            break;
        }
    }
    tracing::debug!("offload worker stopped");
}
