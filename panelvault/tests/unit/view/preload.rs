use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use super::*;
use crate::foundation::error::{PanelError, PanelResult};

/// `slow` URLs take ten seconds, `bad` URLs fail, everything else answers at once.
#[derive(Default)]
struct ScriptedFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> PanelResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.contains("slow") {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        if url.contains("bad") {
            return Err(PanelError::fetch("boom"));
        }
        Ok(Bytes::from_static(b"ok"))
    }
}

#[test]
fn plan_keeps_raster_paths_in_order() {
    let paths = [
        "/a/1.jpg",
        "/a/readme.txt",
        "/a/2.PNG",
        "/a/3.jxl",
        "/a/4.webp",
        "/a/5.avif",
        "/a/6.gif",
        "/a/7.bmp",
        "/a/8.jpeg",
        "/a/noext",
    ];
    let plan = plan_preload(paths, &PreloadOpts::default());
    assert_eq!(
        plan.high,
        vec!["/a/1.jpg", "/a/2.PNG", "/a/4.webp", "/a/5.avif", "/a/6.gif"]
    );
    assert_eq!(plan.low, vec!["/a/7.bmp", "/a/8.jpeg"]);
    assert_eq!(plan.len(), 7);
}

#[test]
fn plan_from_comma_separated_list() {
    let opts = PreloadOpts {
        high_priority: 1,
        ..PreloadOpts::default()
    };
    let plan = PreloadPlan::from_path_list("a.png, b.png,,c.txt", &opts);
    assert_eq!(plan.high, vec!["a.png"]);
    assert_eq!(plan.low, vec!["b.png"]);
    assert!(PreloadPlan::from_path_list("", &opts).is_empty());
}

#[tokio::test(start_paused = true)]
async fn preload_counts_eager_fetches() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let plan = plan_preload(["1.png", "bad.png", "3.png"], &PreloadOpts::default());
    let mut report = preload(fetcher.clone(), plan, &PreloadOpts::default()).await;
    assert_eq!(report.high_loaded, 2);
    assert_eq!(report.high_failed, 1);
    assert_eq!(report.high_pending, 0);
    assert_eq!(report.low_scheduled, 0);
    assert_eq!(report.finish_low().await, 0);
}

#[tokio::test(start_paused = true)]
async fn preload_returns_at_the_deadline() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let opts = PreloadOpts::default();
    let plan = plan_preload(["1.png", "slow.png"], &opts);

    let started = tokio::time::Instant::now();
    let report = preload(fetcher.clone(), plan, &opts).await;
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(2000), "{waited:?}");
    assert!(waited < Duration::from_secs(10), "{waited:?}");
    assert_eq!(report.high_loaded, 1);
    assert_eq!(report.high_pending, 1);
}

#[tokio::test(start_paused = true)]
async fn deferred_bucket_waits_for_the_delay() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let opts = PreloadOpts {
        high_priority: 1,
        ..PreloadOpts::default()
    };
    let plan = plan_preload(["1.png", "2.png", "bad.png", "4.png"], &opts);
    let mut report = preload(fetcher.clone(), plan, &opts).await;
    assert_eq!(report.low_scheduled, 3);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

    assert_eq!(report.finish_low().await, 2);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn deferred_delay_counts_from_invocation() {
    let fetcher = Arc::new(ScriptedFetcher::default());
    let opts = PreloadOpts {
        high_priority: 1,
        ..PreloadOpts::default()
    };
    let plan = plan_preload(["slow.png", "b.png"], &opts);

    let running = {
        let fetcher = fetcher.clone();
        let opts = opts.clone();
        tokio::spawn(async move { preload(fetcher, plan, &opts).await })
    };

    // The eager page is still loading, but the deferred bucket has started.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);

    let mut report = running.await.unwrap();
    assert_eq!(report.high_pending, 1);
    assert_eq!(report.finish_low().await, 1);
}
