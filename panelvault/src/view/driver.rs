use std::sync::Arc;

use crate::foundation::error::{PanelError, PanelResult};
use crate::foundation::raster::Surface;
use crate::offload::dispatcher::OffloadDispatcher;
use crate::ports::cipher::TransformKind;
use crate::ports::codec::Codec;
use crate::view::fetch::PageFetcher;
use crate::view::visibility::{Observation, TargetId};

/// Outcome of a render target's one-time work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageStatus {
    /// Not activated yet, or activated but not driven yet.
    Dormant,
    /// The decrypted surface is renderable.
    Ready,
    /// Fetch, decode or transform failed; the page renders as a placeholder.
    Failed {
        /// Human-readable reason.
        reason: String,
    },
}

/// One page slot in the reader: its URL, visibility registration and render result.
#[derive(Debug)]
pub struct PageTarget {
    url: String,
    observation: Observation,
    status: PageStatus,
    surface: Option<Surface>,
    attempted: bool,
}

impl PageTarget {
    /// Target for the already-resolved `url`, registered through `observation`.
    pub fn new(url: impl Into<String>, observation: Observation) -> Self {
        Self {
            url: url.into(),
            observation,
            status: PageStatus::Dormant,
            surface: None,
            attempted: false,
        }
    }

    /// Visibility id of this target.
    pub fn id(&self) -> TargetId {
        self.observation.id()
    }

    /// Page URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current status.
    pub fn status(&self) -> &PageStatus {
        &self.status
    }

    /// The renderable surface, once [`PageStatus::Ready`].
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    /// Whether the one-time work has started.
    pub fn is_attempted(&self) -> bool {
        self.attempted
    }
}

/// Runs the fetch, decode, decrypt and present sequence for render targets.
///
/// A driver owns one [`OffloadDispatcher`], so it drives one target at a time. Independent
/// targets that should progress in parallel each get their own driver.
pub struct PageRenderDriver {
    fetcher: Arc<dyn PageFetcher>,
    codec: Arc<dyn Codec>,
    dispatcher: OffloadDispatcher,
}

impl std::fmt::Debug for PageRenderDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRenderDriver")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl PageRenderDriver {
    /// Driver over the given collaborators.
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        codec: Arc<dyn Codec>,
        dispatcher: OffloadDispatcher,
    ) -> Self {
        Self {
            fetcher,
            codec,
            dispatcher,
        }
    }

    /// The dispatcher used for decryption.
    pub fn dispatcher(&self) -> &OffloadDispatcher {
        &self.dispatcher
    }

    /// Run the one-time sequence if `target` is activated and has not been attempted.
    ///
    /// Dormant and already-attempted targets are left untouched. Failures are recorded on the
    /// target and never returned.
    #[tracing::instrument(skip_all, fields(target_id = %target.id(), url = %target.url))]
    pub async fn drive<'t>(&mut self, target: &'t mut PageTarget) -> &'t PageStatus {
        if target.attempted || !target.observation.is_activated() {
            return &target.status;
        }
        target.attempted = true;

        match self.render(&target.url).await {
            Ok(surface) => {
                tracing::debug!(
                    width = surface.width(),
                    height = surface.height(),
                    "page ready"
                );
                target.surface = Some(surface);
                target.status = PageStatus::Ready;
            }
            Err(err) => {
                tracing::warn!(error = %err, "page failed; rendering placeholder");
                target.status = PageStatus::Failed {
                    reason: err.to_string(),
                };
            }
        }
        &target.status
    }

    /// Wait for `target` to activate, then [`drive`](Self::drive) it.
    ///
    /// If the gate goes away before firing, the target stays dormant.
    pub async fn run_when_visible<'t>(&mut self, target: &'t mut PageTarget) -> &'t PageStatus {
        if !target.attempted && !target.observation.activated().await {
            return &target.status;
        }
        self.drive(target).await
    }

    async fn render(&mut self, url: &str) -> PanelResult<Surface> {
        let bytes = self.fetcher.fetch(url).await?;

        let codec = self.codec.clone();
        let raster = tokio::task::spawn_blocking(move || codec.decode(&bytes))
            .await
            .map_err(|e| PanelError::decode(format!("decode task: {e}")))?
            .map_err(|e| match e {
                PanelError::Codec(msg) => PanelError::decode(msg),
                other => other,
            })?;

        let mut surface = Surface::new(raster.width, raster.height);
        surface.paint(&raster)?;
        let extracted = surface.read_raster();

        let decrypted = self
            .dispatcher
            .submit(TransformKind::Decrypt, extracted)
            .await?;
        if (decrypted.width, decrypted.height) != (surface.width(), surface.height()) {
            return Err(PanelError::transform(format!(
                "cipher returned {}x{} for a {}x{} page",
                decrypted.width,
                decrypted.height,
                surface.width(),
                surface.height()
            )));
        }
        surface.paint(&decrypted)?;
        surface.mark_renderable();
        Ok(surface)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/view/driver.rs"]
mod tests;
