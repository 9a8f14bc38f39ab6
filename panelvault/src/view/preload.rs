//! Warm the fetch path for a reader's first pages.
//!
//! The first few pages are fetched eagerly and awaited up to a deadline; the rest are fetched
//! in the background after a delay. Fetch failures only reduce the counts in the report.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};

use crate::view::fetch::PageFetcher;

const PRELOAD_EXTENSIONS: [&str; 7] = ["bmp", "jpg", "jpeg", "gif", "png", "webp", "avif"];

/// Preload scheduling knobs.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PreloadOpts {
    /// How many leading pages are fetched eagerly.
    pub high_priority: usize,
    /// Delay before the remaining pages start fetching.
    pub low_priority_delay_ms: u64,
    /// Longest [`preload`] waits for the eager pages.
    pub high_priority_deadline_ms: u64,
}

impl Default for PreloadOpts {
    fn default() -> Self {
        Self {
            high_priority: 5,
            low_priority_delay_ms: 1000,
            high_priority_deadline_ms: 2000,
        }
    }
}

/// Paths split into eager and deferred buckets, in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreloadPlan {
    /// Fetched immediately.
    pub high: Vec<String>,
    /// Fetched after the delay.
    pub low: Vec<String>,
}

impl PreloadPlan {
    /// Plan from a comma-separated path list.
    pub fn from_path_list(list: &str, opts: &PreloadOpts) -> Self {
        plan_preload(
            list.split(',').map(str::trim).filter(|p| !p.is_empty()),
            opts,
        )
    }

    /// Total number of planned paths.
    pub fn len(&self) -> usize {
        self.high.len() + self.low.len()
    }

    /// `true` when nothing is planned.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keep raster paths and split them into buckets.
pub fn plan_preload<I, S>(paths: I, opts: &PreloadOpts) -> PreloadPlan
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut plan = PreloadPlan::default();
    for path in paths {
        let path = path.as_ref();
        if !is_preloadable(path) {
            continue;
        }
        if plan.high.len() < opts.high_priority {
            plan.high.push(path.to_string());
        } else {
            plan.low.push(path.to_string());
        }
    }
    plan
}

fn is_preloadable(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            PRELOAD_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// What [`preload`] observed before returning.
#[derive(Debug, Default)]
pub struct PreloadReport {
    /// Eager fetches that succeeded before the deadline.
    pub high_loaded: usize,
    /// Eager fetches that failed before the deadline.
    pub high_failed: usize,
    /// Eager fetches still running when the deadline passed.
    pub high_pending: usize,
    /// Deferred paths handed to the background task.
    pub low_scheduled: usize,
    low: Option<JoinHandle<usize>>,
}

impl PreloadReport {
    /// Wait for the deferred bucket; returns how many of its fetches succeeded.
    pub async fn finish_low(&mut self) -> usize {
        match self.low.take() {
            Some(handle) => handle.await.unwrap_or(0),
            None => 0,
        }
    }
}

/// Run `plan` against `fetcher`.
///
/// Must be called inside a Tokio runtime.
pub async fn preload(
    fetcher: Arc<dyn PageFetcher>,
    plan: PreloadPlan,
    opts: &PreloadOpts,
) -> PreloadReport {
    let mut report = PreloadReport {
        low_scheduled: plan.low.len(),
        ..PreloadReport::default()
    };

    // The deferred delay runs from invocation, alongside the eager fetches.
    if !plan.low.is_empty() {
        let delay = Duration::from_millis(opts.low_priority_delay_ms);
        let low = plan.low;
        let fetcher = fetcher.clone();
        report.low = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut deferred = JoinSet::new();
            for url in low {
                let fetcher = fetcher.clone();
                deferred.spawn(async move { fetch_logged(fetcher.as_ref(), &url).await });
            }
            let mut loaded = 0;
            while let Some(joined) = deferred.join_next().await {
                if matches!(joined, Ok(true)) {
                    loaded += 1;
                }
            }
            loaded
        }));
    }

    let mut eager = JoinSet::new();
    for url in plan.high {
        let fetcher = fetcher.clone();
        eager.spawn(async move { fetch_logged(fetcher.as_ref(), &url).await });
    }

    let deadline = Duration::from_millis(opts.high_priority_deadline_ms);
    let (mut loaded, mut failed) = (0, 0);
    let drained = tokio::time::timeout(deadline, async {
        while let Some(joined) = eager.join_next().await {
            if matches!(joined, Ok(true)) {
                loaded += 1;
            } else {
                failed += 1;
            }
        }
    })
    .await;
    if drained.is_err() {
        tracing::debug!(pending = eager.len(), "preload deadline passed");
    }
    report.high_loaded = loaded;
    report.high_failed = failed;
    report.high_pending = eager.len();
    eager.detach_all();

    report
}

async fn fetch_logged(fetcher: &dyn PageFetcher, url: &str) -> bool {
    match fetcher.fetch(url).await {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(url, error = %e, "preload fetch failed");
            false
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/view/preload.rs"]
mod tests;
