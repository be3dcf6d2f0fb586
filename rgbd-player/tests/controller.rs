use glam::Vec3;
use image::{Rgb, RgbImage};
use rgbd_capture::{CaptureError, MemoryCache, Transport, TransportResponse};
use rgbd_cloud::ingest::encode_depth;
use rgbd_cloud::RgbdFrame;
use rgbd_player::{
    AssetController, MediaBackend, MediaSession, MemorySettings, Playback, PlayerError,
    SettingsStore, StillBackend, VideoSize,
};
use serde_json::json;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

/// Serves a body in small reads so progress sees several chunks.
struct ChunkedReader {
    data: Cursor<Vec<u8>>,
    chunk: usize,
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = buf.len().min(self.chunk);
        self.data.read(&mut buf[..n])
    }
}

#[derive(Default)]
struct FakeTransport {
    files: HashMap<String, Vec<u8>>,
    gates: Mutex<HashMap<String, mpsc::Receiver<()>>>,
    opens: AtomicUsize,
}

impl FakeTransport {
    fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(url.to_string(), bytes);
        self
    }

    /// Hold the next open of `url` until the returned sender fires or drops.
    fn gate(&self, url: &str) -> mpsc::Sender<()> {
        let (tx, rx) = mpsc::channel();
        self.gates.lock().unwrap().insert(url.to_string(), rx);
        tx
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Transport for FakeTransport {
    fn open(&self, url: &str) -> Result<TransportResponse, CaptureError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().remove(url);
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        match self.files.get(url) {
            Some(bytes) => Ok(TransportResponse::ok(
                Some(bytes.len() as u64),
                Box::new(ChunkedReader {
                    data: Cursor::new(bytes.clone()),
                    chunk: 16,
                }),
            )),
            None => Ok(TransportResponse {
                status: 404,
                content_length: None,
                body: None,
            }),
        }
    }
}

#[derive(Debug, Default)]
struct PlaybackLog {
    paused: bool,
    muted: bool,
    seeks: Vec<Duration>,
}

struct ManualPlayback {
    log: Arc<Mutex<PlaybackLog>>,
    duration: Option<Duration>,
}

impl Playback for ManualPlayback {
    fn play(&mut self) {
        self.log.lock().unwrap().paused = false;
    }

    fn pause(&mut self) {
        self.log.lock().unwrap().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.log.lock().unwrap().paused
    }

    fn muted(&self) -> bool {
        self.log.lock().unwrap().muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.log.lock().unwrap().muted = muted;
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn seek(&mut self, position: Duration) {
        self.log.lock().unwrap().seeks.push(position);
    }
}

/// Media backend whose frame-ready notices are fired by the test.
#[derive(Default)]
struct ManualBackend {
    duration: Option<Duration>,
    log: Arc<Mutex<PlaybackLog>>,
    pending: Mutex<Vec<oneshot::Sender<VideoSize>>>,
    opens: AtomicUsize,
}

impl ManualBackend {
    /// Fire the frame-ready notice of the `n`th opened video.
    fn fire(&self, n: usize, size: VideoSize) -> Result<(), VideoSize> {
        let sender = self.pending.lock().unwrap().remove(n);
        sender.send(size)
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Whether the receiver for the `n`th pending notice has been dropped.
    fn receiver_dropped(&self, n: usize) -> bool {
        self.pending.lock().unwrap()[n].is_closed()
    }
}

impl MediaBackend for ManualBackend {
    fn open(&self, _bytes: &[u8]) -> Result<MediaSession, PlayerError> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().push(tx);
        self.log.lock().unwrap().paused = true;
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(MediaSession {
            playback: Box::new(ManualPlayback {
                log: Arc::clone(&self.log),
                duration: self.duration,
            }),
            frame_ready: rx,
        })
    }
}

/// A tiny container header, some payload and a metadata trailer.
fn video(payload: &str, fx: f32) -> Vec<u8> {
    let mut bytes = b"\x00\x00\x00\x18ftypmp42".to_vec();
    bytes.extend_from_slice(payload.as_bytes());
    bytes.extend_from_slice(
        format!(r#"{{"intrinsicMatrix":[{fx},0,0,0,{fx},0,2,1.5,1],"fps":30}}"#).as_bytes(),
    );
    bytes
}

/// 4x3 logical frame at uniform depth 1.0.
fn uniform_frame() -> RgbdFrame {
    let depth = RgbImage::from_pixel(4, 3, encode_depth(1.0));
    let color = RgbImage::from_pixel(4, 3, Rgb([40, 80, 120]));
    RgbdFrame::from_halves(&depth, &color).unwrap()
}

fn transport() -> FakeTransport {
    FakeTransport::default()
        .with("http://x/a.mp4", video("clip a", 100.0))
        .with("http://x/b.mp4", video("clip b", 200.0))
        .with("http://x/broken.mp4", b"no trailer here".to_vec())
}

#[tokio::test]
async fn test_load_installs_asset_and_reports_frame_size() {
    let transport = Arc::new(transport());
    let backend = Arc::new(StillBackend::new(Some(VideoSize::new(8, 3))));
    let mut controller =
        AssetController::new(Handle::current(), backend).with_transport(transport.clone());

    assert_eq!(controller.fingerprint(), "");
    controller.load_and_wait("http://x/a.mp4").await.unwrap();

    let bytes = video("clip a", 100.0);
    assert_eq!(
        controller.fingerprint(),
        rgbd_data::fingerprint(&bytes).as_str()
    );
    let asset = controller.asset().unwrap();
    assert_eq!(asset.intrinsics().fx(), 100.0);
    assert_eq!(asset.extra()["fps"], json!(30));
    assert_eq!(asset.size(), Some(VideoSize::new(8, 3)));
    assert_eq!(controller.point_count(), 12);
    assert_eq!(controller.indices(), (0..12).collect::<Vec<u32>>().as_slice());
    assert_eq!(controller.inverse_intrinsics().ifx, 0.01);
    assert!(!controller.is_loading());
}

#[tokio::test]
async fn test_reconstruct_after_frame_ready() {
    let backend = Arc::new(StillBackend::new(Some(VideoSize::new(8, 3))));
    let mut controller =
        AssetController::new(Handle::current(), backend).with_transport(Arc::new(transport()));
    let frame = uniform_frame();

    assert_eq!(controller.reconstruct(&frame).count(), 0);
    controller.load_and_wait("http://x/a.mp4").await.unwrap();

    let points: Vec<_> = controller.reconstruct(&frame).collect();
    assert_eq!(points.len(), 12);
    assert!(points.iter().all(|p| (p.position.z + p.depth).abs() < 1e-6));
    let (cloud, stats) = controller.reconstruct_cloud(&frame);
    assert_eq!(cloud.points, points);
    assert_eq!(stats.rejected(), 0);

    controller.set_range_far(0.5);
    assert_eq!(controller.reconstruct(&frame).count(), 0);
}

#[tokio::test]
async fn test_no_points_until_media_is_ready() {
    let backend = Arc::new(ManualBackend::default());
    let mut controller = AssetController::new(Handle::current(), backend.clone())
        .with_transport(Arc::new(transport()));
    let frame = uniform_frame();

    controller.load_and_wait("http://x/a.mp4").await.unwrap();
    controller.pump();
    assert_eq!(controller.point_count(), 0);
    assert_eq!(controller.reconstruct(&frame).count(), 0);

    backend.fire(0, VideoSize::new(8, 3)).unwrap();
    controller.pump();
    assert_eq!(controller.point_count(), 12);
    assert_eq!(controller.reconstruct(&frame).count(), 12);
}

#[tokio::test]
async fn test_frame_ready_seeks_to_start_offset() {
    let backend = Arc::new(ManualBackend {
        duration: Some(Duration::from_millis(400)),
        ..Default::default()
    });
    let mut controller = AssetController::new(Handle::current(), backend.clone())
        .with_transport(Arc::new(transport()));
    controller.load_and_wait("http://x/a.mp4").await.unwrap();
    backend.fire(0, VideoSize::new(8, 3)).unwrap();
    controller.pump();
    assert_eq!(
        backend.log.lock().unwrap().seeks,
        vec![Duration::from_millis(400)]
    );

    let long = Arc::new(ManualBackend {
        duration: Some(Duration::from_secs(30)),
        ..Default::default()
    });
    let mut controller = AssetController::new(Handle::current(), long.clone())
        .with_transport(Arc::new(transport()));
    controller.load_and_wait("http://x/a.mp4").await.unwrap();
    long.fire(0, VideoSize::new(8, 3)).unwrap();
    controller.pump();
    assert_eq!(long.log.lock().unwrap().seeks, vec![Duration::from_secs(1)]);
}

#[tokio::test]
async fn test_loading_b_replaces_a() {
    let backend = Arc::new(ManualBackend::default());
    let mut controller = AssetController::new(Handle::current(), backend.clone())
        .with_transport(Arc::new(transport()));

    controller.load_and_wait("http://x/a.mp4").await.unwrap();
    backend.fire(0, VideoSize::new(8, 3)).unwrap();
    controller.pump();
    let fingerprint_a = controller.fingerprint().to_string();
    assert_eq!(controller.point_count(), 12);

    controller.load_and_wait("http://x/b.mp4").await.unwrap();
    assert_ne!(controller.fingerprint(), fingerprint_a);
    assert_eq!(controller.asset().unwrap().intrinsics().fx(), 200.0);
    assert_eq!(controller.point_count(), 0);
    assert!(controller.indices().is_empty());

    backend.fire(0, VideoSize::new(20, 10)).unwrap();
    controller.pump();
    assert_eq!(controller.point_count(), 100);
}

#[tokio::test]
async fn test_superseded_load_never_changes_state() {
    let transport = Arc::new(transport());
    let release_a = transport.gate("http://x/a.mp4");
    let backend = Arc::new(ManualBackend::default());
    let mut controller = AssetController::new(Handle::current(), backend.clone())
        .with_transport(transport.clone());

    let ticket_a = controller.load("http://x/a.mp4");
    let ticket_b = controller.load("http://x/b.mp4");
    assert!(ticket_b.generation() > ticket_a.generation());
    assert!(matches!(
        controller.wait(&ticket_a).await,
        Err(PlayerError::Superseded)
    ));

    controller.wait(&ticket_b).await.unwrap();
    let fingerprint_b = controller.fingerprint().to_string();
    backend.fire(0, VideoSize::new(8, 3)).unwrap();
    controller.pump();

    // A's media is opened by its task and only dropped once the controller
    // has received and discarded the stale completion.
    release_a.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while backend.opens() < 2 || !backend.receiver_dropped(0) {
            tokio::time::sleep(Duration::from_millis(5)).await;
            controller.pump();
        }
    })
    .await
    .expect("stale completion was never delivered");
    assert_eq!(transport.opens(), 2);

    assert_eq!(controller.fingerprint(), fingerprint_b);
    assert_eq!(controller.asset().unwrap().url(), "http://x/b.mp4");
    assert_eq!(controller.asset().unwrap().intrinsics().fx(), 200.0);
    assert_eq!(controller.point_count(), 12);
}

#[tokio::test]
async fn test_previous_frame_ready_is_torn_down() {
    let transport = Arc::new(transport());
    let backend = Arc::new(ManualBackend::default());
    let mut controller = AssetController::new(Handle::current(), backend.clone())
        .with_transport(transport);

    controller.load_and_wait("http://x/a.mp4").await.unwrap();
    controller.load_and_wait("http://x/b.mp4").await.unwrap();
    assert_eq!(backend.opens(), 2);

    // A's receiver was dropped when B was installed.
    assert!(backend.fire(0, VideoSize::new(100, 100)).is_err());
    controller.pump();
    assert_eq!(controller.point_count(), 0);

    backend.fire(0, VideoSize::new(8, 3)).unwrap();
    controller.pump();
    assert_eq!(controller.point_count(), 12);
}

#[tokio::test]
async fn test_wait_for_frame_ready_installs_size() {
    let backend = Arc::new(ManualBackend::default());
    let mut controller = AssetController::new(Handle::current(), backend.clone())
        .with_transport(Arc::new(transport()));
    assert_eq!(controller.wait_for_frame_ready().await, None);

    controller.load_and_wait("http://x/a.mp4").await.unwrap();
    let notifier = Arc::clone(&backend);
    let fired = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        notifier.fire(0, VideoSize::new(8, 3))
    });

    assert_eq!(
        controller.wait_for_frame_ready().await,
        Some(VideoSize::new(8, 3))
    );
    fired.await.unwrap().unwrap();
    assert_eq!(controller.point_count(), 12);
    assert_eq!(controller.asset().unwrap().size(), Some(VideoSize::new(8, 3)));
    assert_eq!(backend.log.lock().unwrap().seeks, vec![Duration::from_secs(1)]);

    // The notice is single use.
    assert_eq!(controller.wait_for_frame_ready().await, None);
}

#[tokio::test]
async fn test_wait_for_frame_ready_when_media_closes() {
    let backend = Arc::new(ManualBackend::default());
    let mut controller = AssetController::new(Handle::current(), backend.clone())
        .with_transport(Arc::new(transport()));
    controller.load_and_wait("http://x/a.mp4").await.unwrap();

    backend.pending.lock().unwrap().clear();
    assert_eq!(controller.wait_for_frame_ready().await, None);
    assert_eq!(controller.point_count(), 0);
    assert!(controller.indices().is_empty());
    assert!(backend.log.lock().unwrap().seeks.is_empty());
}

#[tokio::test]
async fn test_failed_load_keeps_previous_asset() {
    let backend = Arc::new(StillBackend::new(Some(VideoSize::new(8, 3))));
    let mut controller =
        AssetController::new(Handle::current(), backend).with_transport(Arc::new(transport()));
    controller.load_and_wait("http://x/a.mp4").await.unwrap();
    let fingerprint_a = controller.fingerprint().to_string();

    let missing = controller.load_and_wait("http://x/missing.mp4").await;
    assert!(matches!(
        missing,
        Err(PlayerError::Capture(CaptureError::HttpStatus { status: 404, .. }))
    ));
    assert!(controller.last_error().is_some());
    assert_eq!(controller.fingerprint(), fingerprint_a);
    assert_eq!(controller.point_count(), 12);

    let broken = controller.load_and_wait("http://x/broken.mp4").await;
    assert!(matches!(broken, Err(PlayerError::Metadata(_))));
    assert_eq!(controller.fingerprint(), fingerprint_a);

    controller.load_and_wait("http://x/b.mp4").await.unwrap();
    assert!(controller.last_error().is_none());
}

#[tokio::test]
async fn test_wait_after_pump_returns_recorded_outcome() {
    let backend = Arc::new(StillBackend::new(None));
    let mut controller =
        AssetController::new(Handle::current(), backend).with_transport(Arc::new(transport()));
    let ticket = controller.load("http://x/missing.mp4");
    while controller.is_loading() {
        tokio::time::sleep(Duration::from_millis(5)).await;
        controller.pump();
    }
    assert!(matches!(
        controller.wait(&ticket).await,
        Err(PlayerError::LoadFailed(_))
    ));
}

#[tokio::test]
async fn test_parameters_persist_per_fingerprint() {
    let settings = Arc::new(MemorySettings::new());
    let backend = Arc::new(StillBackend::new(Some(VideoSize::new(8, 3))));
    let mut controller = AssetController::new(Handle::current(), backend)
        .with_transport(Arc::new(transport()))
        .with_settings(settings.clone());

    // Nothing is stored without an asset.
    controller.set_scale(2.0);
    assert_eq!(controller.params().scale(), 2.0);

    controller.load_and_wait("http://x/a.mp4").await.unwrap();
    let fingerprint_a = controller.fingerprint().to_string();
    assert!(settings.get(&fingerprint_a).is_empty());
    assert_eq!(controller.params().scale(), 1.0);

    controller.set_range_far(2.0);
    controller.set_range_near(0.4);
    controller.set_point_size(3.0);
    controller.set_show_depth_map(true);
    let stored = settings.get(&fingerprint_a);
    assert_eq!(stored["rangeNear"], json!(0.4f32));
    assert_eq!(stored["rangeFar"], json!(2.0));
    assert_eq!(stored["pointSize"], json!(3.0));
    assert_eq!(stored["showDepthMap"], json!(true));

    controller.load_and_wait("http://x/b.mp4").await.unwrap();
    assert_eq!(controller.params().point_size(), 1.0);
    assert_eq!(controller.params().range_near(), 0.1);
    assert!(!controller.params().show_depth_map());

    controller.load_and_wait("http://x/a.mp4").await.unwrap();
    assert_eq!(controller.params().point_size(), 3.0);
    assert_eq!(controller.params().range_near(), 0.4);
    assert_eq!(controller.params().range_far(), 2.0);
    assert!(controller.params().show_depth_map());
    assert!((controller.range_box().size - 1.6).abs() < 1e-6);
}

#[tokio::test]
async fn test_range_writes_keep_near_below_far() {
    let backend = Arc::new(StillBackend::new(None));
    let mut controller = AssetController::new(Handle::current(), backend);
    controller.set_range_near(2.0);
    assert_eq!(controller.params().range_far(), 2.0);
    assert_eq!(controller.range_box().size, 0.0);
    controller.set_range_far(0.5);
    assert_eq!(controller.params().range_near(), 0.5);
    controller.set_range_far(1.5);
    assert_eq!(controller.range_box().size, 1.0);
    assert_eq!(controller.range_box().cloud_origin, Vec3::new(0.0, 0.0, 0.5));
}

#[tokio::test]
async fn test_progress_is_monotonic_and_ends_once() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let observed = Arc::clone(&seen);
    let backend = Arc::new(StillBackend::new(None));
    let mut controller = AssetController::new(Handle::current(), backend)
        .with_transport(Arc::new(transport()))
        .with_progress_observer(move |p| observed.lock().unwrap().push(p.progress));

    controller.load_and_wait("http://x/a.mp4").await.unwrap();
    let seen = seen.lock().unwrap().clone();
    assert!(seen.len() > 2);
    assert_eq!(*seen.last().unwrap(), 1.0);
    assert_eq!(seen.iter().filter(|&&v| v == 1.0).count(), 1);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(controller.progress().map(|p| p.progress), Some(1.0));
}

#[tokio::test]
async fn test_cache_serves_repeat_loads() {
    let transport = Arc::new(transport());
    let backend = Arc::new(StillBackend::new(None));
    let mut controller = AssetController::new(Handle::current(), backend)
        .with_transport(transport.clone())
        .with_cache(Arc::new(MemoryCache::new()));

    controller.load_and_wait("http://x/a.mp4").await.unwrap();
    let first = controller.fingerprint().to_string();
    controller.load_and_wait("http://x/a.mp4").await.unwrap();
    assert_eq!(transport.opens(), 1);
    assert_eq!(controller.fingerprint(), first);
}

#[tokio::test]
async fn test_playback_controls() {
    let backend = Arc::new(ManualBackend::default());
    let mut controller = AssetController::new(Handle::current(), backend.clone())
        .with_transport(Arc::new(transport()));

    assert!(!controller.toggle(None));
    assert!(controller.muted());
    controller.set_muted(false);

    controller.load_and_wait("http://x/a.mp4").await.unwrap();
    assert!(!controller.muted());
    assert!(!controller.is_playing());
    assert!(controller.toggle(None));
    assert!(!controller.toggle(None));
    assert!(controller.toggle(Some(true)));
    assert!(controller.toggle(Some(true)));
    controller.pause();
    assert!(!controller.is_playing());
    controller.play();
    assert!(controller.is_playing());
    controller.set_muted(true);
    assert!(backend.log.lock().unwrap().muted);
}

#[tokio::test]
async fn test_adjust_point_size_uses_distance_and_resolution() {
    let backend = Arc::new(StillBackend::new(Some(VideoSize::new(1280, 320))));
    let mut controller =
        AssetController::new(Handle::current(), backend).with_transport(Arc::new(transport()));
    controller.load_and_wait("http://x/a.mp4").await.unwrap();

    controller.set_position(Vec3::new(0.0, 0.0, -2.0));
    controller.adjust_point_size(Vec3::ZERO);
    assert!((controller.params().point_size() - 11.0).abs() < 1e-5);

    controller.adjust_point_size(Vec3::new(0.0, 0.0, 5.0));
    assert_eq!(controller.params().point_size(), 2.0);
}

#[tokio::test]
async fn test_adaptive_point_size_is_not_persisted() {
    let settings = Arc::new(MemorySettings::new());
    let backend = Arc::new(StillBackend::new(Some(VideoSize::new(1280, 320))));
    let mut controller = AssetController::new(Handle::current(), backend)
        .with_transport(Arc::new(transport()))
        .with_settings(settings.clone());
    controller.load_and_wait("http://x/a.mp4").await.unwrap();
    let fingerprint = controller.fingerprint().to_string();

    for z in [-1.0, -2.0, -3.0, -4.0] {
        controller.adjust_point_size(Vec3::new(0.0, 0.0, z));
    }
    assert_eq!(controller.params().point_size(), 2.0);
    assert!(settings.get(&fingerprint).is_empty());

    controller.set_point_size(6.0);
    assert_eq!(settings.get(&fingerprint)["pointSize"], json!(6.0));
}

#[tokio::test]
async fn test_ignored_flatness_write_is_not_persisted() {
    let settings = Arc::new(MemorySettings::new());
    let backend = Arc::new(StillBackend::new(None));
    let mut controller = AssetController::new(Handle::current(), backend)
        .with_transport(Arc::new(transport()))
        .with_settings(settings.clone());
    controller.load_and_wait("http://x/a.mp4").await.unwrap();
    let fingerprint = controller.fingerprint().to_string();

    controller.set_flatness(-1.0);
    assert_eq!(controller.params().flatness(), 1.0);
    assert!(settings.get(&fingerprint).is_empty());

    controller.set_flatness(0.5);
    assert_eq!(settings.get(&fingerprint)["flatness"], json!(0.5));
}
