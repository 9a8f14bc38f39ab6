use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::*;
use crate::foundation::error::PanelError;
use crate::foundation::raster::Surface;
use crate::ports::tile_shuffle::TileShuffleCipher;

fn init_logs() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

struct FailingCipher;

impl Cipher for FailingCipher {
    fn transform(&self, _: TransformKind, _: &mut Surface, _: &RasterBuffer) -> PanelResult<()> {
        Err(PanelError::transform("deliberate failure"))
    }
}

struct PanickingCipher;

impl Cipher for PanickingCipher {
    fn transform(&self, _: TransformKind, _: &mut Surface, _: &RasterBuffer) -> PanelResult<()> {
        panic!("deliberate panic")
    }
}

/// Sleeps on its first call only.
struct SlowFirstCipher {
    calls: AtomicUsize,
    inner: TileShuffleCipher,
}

impl Cipher for SlowFirstCipher {
    fn transform(
        &self,
        kind: TransformKind,
        surface: &mut Surface,
        source: &RasterBuffer,
    ) -> PanelResult<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            std::thread::sleep(Duration::from_millis(200));
        }
        self.inner.transform(kind, surface, source)
    }
}

fn page(width: u32, height: u32, seed: u8) -> RasterBuffer {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for i in 0..(width * height) {
        pixels.extend_from_slice(&[(i as u8).wrapping_mul(seed), seed, (i >> 8) as u8, 255]);
    }
    RasterBuffer::new(width, height, pixels).unwrap()
}

fn shuffle() -> Arc<dyn Cipher> {
    Arc::new(TileShuffleCipher::new(4).unwrap())
}

#[tokio::test]
async fn worker_path_matches_synchronous_path() {
    let mut d = OffloadDispatcher::new(shuffle(), OffloadOpts::default());
    assert_eq!(d.state(), WorkerState::Unprobed);

    let r = page(32, 24, 3);
    let expected = SyncExecutor::new(shuffle())
        .run_raster(TransformKind::Decrypt, r.clone())
        .unwrap();
    let got = d.submit(TransformKind::Decrypt, r).await.unwrap();

    assert_eq!(got, expected);
    assert_eq!(d.state(), WorkerState::Ready);
    assert_eq!(d.stats().offloaded, 1);
    assert_eq!(d.stats().fallbacks, 0);
}

#[tokio::test]
async fn forced_unavailable_equals_synchronous_run() {
    let mut d = OffloadDispatcher::synchronous_only(shuffle());
    let r = page(20, 12, 9);

    let mut surface = Surface::from_raster(r.clone()).unwrap();
    SyncExecutor::new(shuffle())
        .run(TransformKind::Decrypt, &mut surface)
        .unwrap();

    let got = d.submit(TransformKind::Decrypt, r).await.unwrap();
    assert_eq!(got, surface.into_raster());
    assert_eq!(d.state(), WorkerState::Unavailable);
    assert_eq!(d.stats().synchronous, 1);
}

#[tokio::test]
async fn disabled_offload_never_spawns() {
    let opts = OffloadOpts {
        enabled: false,
        ..OffloadOpts::default()
    };
    let mut d = OffloadDispatcher::new(shuffle(), opts);
    d.submit(TransformKind::Encrypt, page(8, 8, 1)).await.unwrap();
    assert_eq!(d.state(), WorkerState::Unavailable);
    assert_eq!(d.stats().synchronous, 1);
}

#[tokio::test]
async fn failing_worker_falls_back_to_a_valid_raster() {
    init_logs();
    let mut d = OffloadDispatcher::new(shuffle(), OffloadOpts::default())
        .with_worker_cipher(Arc::new(FailingCipher));
    let out = d
        .submit(TransformKind::Decrypt, page(10, 10, 5))
        .await
        .unwrap();

    assert_eq!((out.width, out.height), (10, 10));
    assert_eq!(out.pixels.len(), 10 * 10 * 4);
    assert_eq!(d.stats().fallbacks, 1);
    // A failed transform does not take the worker down.
    assert_eq!(d.state(), WorkerState::Ready);
}

#[tokio::test]
async fn panicking_worker_cipher_is_contained() {
    let mut d = OffloadDispatcher::new(shuffle(), OffloadOpts::default())
        .with_worker_cipher(Arc::new(PanickingCipher));
    let r = page(8, 8, 2);
    let expected = SyncExecutor::new(shuffle())
        .run_raster(TransformKind::Encrypt, r.clone())
        .unwrap();

    assert_eq!(d.submit(TransformKind::Encrypt, r.clone()).await.unwrap(), expected);
    assert_eq!(d.submit(TransformKind::Encrypt, r).await.unwrap(), expected);
    assert_eq!(d.stats().fallbacks, 2);
}

#[tokio::test]
async fn synchronous_failure_is_terminal() {
    let mut d = OffloadDispatcher::new(Arc::new(FailingCipher), OffloadOpts::default());
    let err = d
        .submit(TransformKind::Decrypt, page(4, 4, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, PanelError::Transform(_)));
}

#[tokio::test]
async fn encrypt_then_decrypt_white_2x2_is_bit_exact() {
    let mut d = OffloadDispatcher::new(Arc::new(TileShuffleCipher::default()), OffloadOpts::default());
    let white = RasterBuffer::solid(2, 2, [255, 255, 255, 255]);

    let enc = d.submit(TransformKind::Encrypt, white.clone()).await.unwrap();
    let dec = d.submit(TransformKind::Decrypt, enc).await.unwrap();
    assert_eq!(dec, white);
}

#[tokio::test]
async fn late_result_from_abandoned_submission_is_dropped() {
    let cipher = Arc::new(SlowFirstCipher {
        calls: AtomicUsize::new(0),
        inner: TileShuffleCipher::new(4).unwrap(),
    });
    let mut d = OffloadDispatcher::new(shuffle(), OffloadOpts::default()).with_worker_cipher(cipher);

    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        d.submit(TransformKind::Encrypt, page(16, 16, 1)),
    )
    .await;
    assert!(abandoned.is_err());

    let r = page(16, 16, 7);
    let expected = SyncExecutor::new(shuffle())
        .run_raster(TransformKind::Encrypt, r.clone())
        .unwrap();
    let got = d.submit(TransformKind::Encrypt, r).await.unwrap();
    assert_eq!(got, expected);
    assert_eq!(d.stats().offloaded, 1);
}

#[tokio::test]
async fn dispose_downgrades_to_synchronous() {
    let mut d = OffloadDispatcher::new(shuffle(), OffloadOpts::default());
    d.submit(TransformKind::Encrypt, page(8, 8, 4)).await.unwrap();
    d.dispose();
    assert_eq!(d.state(), WorkerState::Disposed);

    d.submit(TransformKind::Encrypt, page(8, 8, 4)).await.unwrap();
    assert_eq!(d.state(), WorkerState::Disposed);
    assert_eq!(d.stats().synchronous, 1);
}

#[tokio::test]
async fn dispose_cancels_in_flight_work() {
    let slow = Arc::new(SlowFirstCipher {
        calls: AtomicUsize::new(0),
        inner: TileShuffleCipher::new(4).unwrap(),
    });
    let mut d = OffloadDispatcher::new(shuffle(), OffloadOpts::default())
        .with_worker_cipher(slow.clone());

    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        d.submit(TransformKind::Encrypt, page(16, 16, 1)),
    )
    .await;
    assert!(abandoned.is_err());
    // Held by this test, the dispatcher and the busy worker thread.
    assert_eq!(Arc::strong_count(&slow), 3);

    d.dispose();
    assert_eq!(d.state(), WorkerState::Disposed);

    let r = page(16, 16, 7);
    let expected = SyncExecutor::new(shuffle())
        .run_raster(TransformKind::Encrypt, r.clone())
        .unwrap();
    assert_eq!(d.submit(TransformKind::Encrypt, r).await.unwrap(), expected);
    assert_eq!(d.stats().synchronous, 1);
    assert_eq!(d.stats().offloaded, 0);

    // The worker finishes its job, finds nobody listening and exits, releasing its cipher.
    let exited = tokio::time::timeout(Duration::from_secs(5), async {
        while Arc::strong_count(&slow) > 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(exited.is_ok(), "worker thread kept its cipher");
    assert_eq!(slow.calls.load(Ordering::SeqCst), 1);
}
