//! Asset lifecycle, live view parameters and per-frame reconstruction.

use crate::asset::VideoAsset;
use crate::errors::PlayerError;
use crate::playback::{FrameReady, MediaBackend, MediaSession, Playback, VideoSize};
use crate::settings::{apply_settings, param_value, MemorySettings, SettingsStore};
use glam::{Quat, Vec3};
use rgbd_capture::{fetch, AnyTransport, ByteCache, DownloadProgress, FetchOptions, Transport};
use rgbd_cloud::reconstruction::{
    identity_indices, points, reconstruct_par, ParamName, ReconstructionStats,
};
use rgbd_cloud::sizing::adaptive_point_size;
use rgbd_cloud::{CloudPoint, Placement, PointCloud, RangeBox, RgbdFrame, ViewParameters};
use rgbd_data::InverseIntrinsics;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, info, warn};

/// Playback position shown once a new video reports its first frame.
pub const INITIAL_SEEK: Duration = Duration::from_secs(1);

/// Handle for one call to [`AssetController::load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    url: String,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

struct LoadedMedia {
    asset: VideoAsset,
    session: MediaSession,
}

enum LoadEventKind {
    Progress(DownloadProgress),
    Loaded(Box<LoadedMedia>),
    Failed(PlayerError),
}

struct LoadEvent {
    generation: u64,
    kind: LoadEventKind,
}

type ProgressObserver = Box<dyn FnMut(DownloadProgress) + Send>;

/// Owns the active video and the parameters the reconstructor reads.
///
/// Loads run on the tokio runtime; their results are only applied in
/// [`pump`](Self::pump), so every state change happens on the owner's thread.
pub struct AssetController {
    runtime: Handle,
    transport: Arc<dyn Transport>,
    cache: Option<Arc<dyn ByteCache>>,
    backend: Arc<dyn MediaBackend>,
    settings: Arc<dyn SettingsStore>,

    defaults: ViewParameters,
    params: ViewParameters,
    placement: Placement,
    range_box: RangeBox,

    asset: Option<VideoAsset>,
    inverse: InverseIntrinsics,
    playback: Option<Box<dyn Playback>>,
    frame_ready: Option<FrameReady>,
    point_count: usize,
    indices: Vec<u32>,

    generation: u64,
    loading: bool,
    progress: Option<DownloadProgress>,
    on_progress: Option<ProgressObserver>,
    last_error: Option<String>,
    events_tx: mpsc::UnboundedSender<LoadEvent>,
    events_rx: mpsc::UnboundedReceiver<LoadEvent>,
}

impl AssetController {
    /// Create a controller that spawns loads on `runtime` and opens media with
    /// `backend`. Uses [`AnyTransport`], no cache and in-memory settings until
    /// configured otherwise.
    pub fn new(runtime: Handle, backend: Arc<dyn MediaBackend>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let defaults = ViewParameters::default();
        Self {
            runtime,
            transport: Arc::new(AnyTransport::new()),
            cache: None,
            backend,
            settings: Arc::new(MemorySettings::new()),
            defaults,
            params: defaults,
            placement: Placement::default(),
            range_box: RangeBox::from_params(&defaults),
            asset: None,
            inverse: InverseIntrinsics::default(),
            playback: None,
            frame_ready: None,
            point_count: 0,
            indices: Vec::new(),
            generation: 0,
            loading: false,
            progress: None,
            on_progress: None,
            last_error: None,
            events_tx,
            events_rx,
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ByteCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = settings;
        self
    }

    /// Parameters used before any load and for assets with nothing stored.
    pub fn with_defaults(mut self, defaults: ViewParameters) -> Self {
        self.defaults = defaults;
        self.params = defaults;
        self.range_box = RangeBox::from_params(&defaults);
        self
    }

    /// Observer for download progress, invoked from [`pump`](Self::pump).
    pub fn with_progress_observer(
        mut self,
        observer: impl FnMut(DownloadProgress) + Send + 'static,
    ) -> Self {
        self.on_progress = Some(Box::new(observer));
        self
    }

    /// Start loading `url` and return immediately. Any load still in flight
    /// is superseded and its results will be ignored.
    #[tracing::instrument(skip(self))]
    pub fn load(&mut self, url: &str) -> LoadTicket {
        self.generation += 1;
        self.loading = true;
        self.progress = None;
        let generation = self.generation;
        info!("Loading {} (generation {})", url, generation);

        let task_url = url.to_string();
        let transport = Arc::clone(&self.transport);
        let cache = self.cache.clone();
        let backend = Arc::clone(&self.backend);
        let tx = self.events_tx.clone();

        self.runtime.spawn(async move {
            let progress_tx = tx.clone();
            let fetch_url = task_url.clone();
            let fetched = tokio::task::spawn_blocking(move || {
                let mut report = |progress: DownloadProgress| {
                    let _ = progress_tx.send(LoadEvent {
                        generation,
                        kind: LoadEventKind::Progress(progress),
                    });
                };
                let mut options = FetchOptions::default().with_progress(&mut report);
                if let Some(cache) = cache.as_deref() {
                    options = options.with_cache(cache);
                }
                fetch(transport.as_ref(), &fetch_url, options)
            })
            .await;

            let kind = match fetched {
                Ok(Ok(bytes)) => match prepare(task_url, bytes, backend.as_ref()) {
                    Ok(loaded) => LoadEventKind::Loaded(Box::new(loaded)),
                    Err(e) => LoadEventKind::Failed(e),
                },
                Ok(Err(e)) => LoadEventKind::Failed(e.into()),
                Err(e) => LoadEventKind::Failed(PlayerError::Task(e.to_string())),
            };
            // The controller may have been dropped; nothing left to notify.
            let _ = tx.send(LoadEvent { generation, kind });
        });

        LoadTicket {
            generation,
            url: url.to_string(),
        }
    }

    /// Apply pending load events and frame-ready notices. Call once per frame.
    pub fn pump(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply_event(event);
        }
        self.poll_frame_ready();
    }

    /// Wait until `ticket`'s load resolves, applying events as they arrive.
    ///
    /// A load that already resolved through [`pump`](Self::pump) returns its
    /// recorded outcome.
    pub async fn wait(&mut self, ticket: &LoadTicket) -> Result<(), PlayerError> {
        loop {
            if ticket.generation != self.generation {
                return Err(PlayerError::Superseded);
            }
            if !self.loading {
                return match &self.last_error {
                    Some(message) => Err(PlayerError::LoadFailed(message.clone())),
                    None => Ok(()),
                };
            }
            let Some(event) = self.events_rx.recv().await else {
                return Err(PlayerError::Task("load channel closed".to_string()));
            };
            if let Some(result) = self.apply_event(event) {
                self.poll_frame_ready();
                return result;
            }
        }
    }

    /// Start a load and wait for it.
    pub async fn load_and_wait(&mut self, url: &str) -> Result<(), PlayerError> {
        let ticket = self.load(url);
        self.wait(&ticket).await
    }

    /// Wait for the current video to report its decoded size.
    pub async fn wait_for_frame_ready(&mut self) -> Option<VideoSize> {
        let receiver = self.frame_ready.as_mut()?;
        let result = receiver.await;
        self.frame_ready = None;
        match result {
            Ok(size) => {
                self.on_frame_ready(size);
                Some(size)
            }
            Err(_) => {
                warn!("Media closed before reporting a frame");
                None
            }
        }
    }

    /// Returns the outcome when `event` resolved the current load.
    fn apply_event(&mut self, event: LoadEvent) -> Option<Result<(), PlayerError>> {
        if event.generation != self.generation {
            debug!(
                "Dropping event from superseded load {} (current {})",
                event.generation, self.generation
            );
            return None;
        }
        match event.kind {
            LoadEventKind::Progress(progress) => {
                self.progress = Some(progress);
                if let Some(observer) = self.on_progress.as_mut() {
                    observer(progress);
                }
                None
            }
            LoadEventKind::Loaded(loaded) => {
                self.loading = false;
                let LoadedMedia { asset, session } = *loaded;
                self.install(asset, session);
                Some(Ok(()))
            }
            LoadEventKind::Failed(error) => {
                self.loading = false;
                warn!("Load failed: {}", error);
                self.last_error = Some(error.to_string());
                Some(Err(error))
            }
        }
    }

    fn install(&mut self, asset: VideoAsset, session: MediaSession) {
        // Old subscription goes first so a late notice cannot reach the new asset.
        self.frame_ready = None;
        self.playback = None;
        self.point_count = 0;
        self.indices.clear();

        let mut playback = session.playback;
        playback.set_muted(self.params.muted());
        self.playback = Some(playback);
        self.frame_ready = Some(session.frame_ready);

        self.inverse = *asset.inverse();
        let muted = self.params.muted();
        self.params = self.defaults;
        self.params.set_muted(muted);
        let stored = self.settings.get(asset.fingerprint().as_str());
        if !stored.is_empty() {
            debug!("Restoring {} stored parameters", stored.len());
        }
        apply_settings(&mut self.params, &stored);
        self.range_box = RangeBox::from_params(&self.params);

        info!(
            "Loaded {} (fingerprint {}, {} bytes)",
            asset.url(),
            asset.fingerprint(),
            asset.bytes().len()
        );
        self.asset = Some(asset);
        self.last_error = None;
    }

    fn poll_frame_ready(&mut self) {
        let Some(receiver) = self.frame_ready.as_mut() else {
            return;
        };
        match receiver.try_recv() {
            Ok(size) => {
                self.frame_ready = None;
                self.on_frame_ready(size);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Closed) => {
                warn!("Media closed before reporting a frame");
                self.frame_ready = None;
            }
        }
    }

    fn on_frame_ready(&mut self, size: VideoSize) {
        let Some(asset) = self.asset.as_mut() else {
            return;
        };
        asset.set_size(size);
        self.point_count = size.point_count();
        self.indices = identity_indices(self.point_count);
        if let Some(playback) = self.playback.as_mut() {
            let target = playback
                .duration()
                .map_or(INITIAL_SEEK, |d| d.min(INITIAL_SEEK));
            playback.seek(target);
        }
        debug!(
            "Frame ready: {}x{} stored, {} points",
            size.width, size.height, self.point_count
        );
    }

    fn persist(&self, names: &[ParamName]) {
        let Some(asset) = self.asset.as_ref() else {
            return;
        };
        let fingerprint = asset.fingerprint().as_str();
        for &name in names {
            let value = param_value(&self.params, name);
            if let Err(e) = self.settings.set(fingerprint, name.as_str(), value) {
                warn!("Failed to persist {}: {}", name, e);
            }
        }
    }

    fn update(&mut self, names: &[ParamName], write: impl FnOnce(&mut ViewParameters)) {
        let before = self.params;
        write(&mut self.params);
        if self.params != before {
            self.range_box = RangeBox::from_params(&self.params);
            self.persist(names);
        }
    }

    pub fn set_point_size(&mut self, value: f32) {
        self.update(&[ParamName::PointSize], |p| p.set_point_size(value));
    }

    pub fn set_flatness(&mut self, value: f32) {
        self.update(&[ParamName::Flatness], |p| p.set_flatness(value));
    }

    pub fn set_scale(&mut self, value: f32) {
        self.update(&[ParamName::Scale], |p| p.set_scale(value));
    }

    pub fn set_show_depth_map(&mut self, value: bool) {
        self.update(&[ParamName::ShowDepthMap], |p| p.set_show_depth_map(value));
    }

    pub fn set_range_near(&mut self, value: f32) {
        self.update(&[ParamName::RangeNear, ParamName::RangeFar], |p| {
            p.set_range_near(value)
        });
    }

    pub fn set_range_far(&mut self, value: f32) {
        self.update(&[ParamName::RangeNear, ParamName::RangeFar], |p| {
            p.set_range_far(value)
        });
    }

    pub fn play(&mut self) {
        if let Some(playback) = self.playback.as_mut() {
            playback.play();
        }
    }

    pub fn pause(&mut self) {
        if let Some(playback) = self.playback.as_mut() {
            playback.pause();
        }
    }

    /// `Some(true)` plays, `Some(false)` pauses, `None` flips. Returns whether
    /// the video is now playing.
    pub fn toggle(&mut self, play: Option<bool>) -> bool {
        let Some(playback) = self.playback.as_mut() else {
            return false;
        };
        let play = play.unwrap_or_else(|| playback.is_paused());
        if play {
            playback.play();
        } else {
            playback.pause();
        }
        !playback.is_paused()
    }

    pub fn is_playing(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| !p.is_paused())
    }

    pub fn muted(&self) -> bool {
        self.playback
            .as_ref()
            .map_or(self.params.muted(), |p| p.muted())
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.params.set_muted(muted);
        if let Some(playback) = self.playback.as_mut() {
            playback.set_muted(muted);
        }
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.placement.position = position;
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.placement.rotation = rotation;
    }

    /// Resize points for a viewer standing at `viewer`.
    ///
    /// Runs every frame, so the result is not persisted; only explicit
    /// [`set_point_size`](Self::set_point_size) calls are.
    pub fn adjust_point_size(&mut self, viewer: Vec3) {
        let vertical = self
            .asset
            .as_ref()
            .and_then(|a| a.size())
            .map_or(0, |s| s.height);
        let size = adaptive_point_size(viewer, &self.placement, vertical);
        self.params.set_point_size(size);
    }

    /// Accepted points of `frame` under the current parameters. Empty until
    /// an asset is loaded and its media has reported a frame.
    pub fn reconstruct<'a>(
        &'a self,
        frame: &'a RgbdFrame,
    ) -> impl Iterator<Item = CloudPoint> + 'a {
        points(frame, &self.params, &self.inverse, &self.indices)
    }

    /// Parallel form of [`reconstruct`](Self::reconstruct).
    pub fn reconstruct_cloud(&self, frame: &RgbdFrame) -> (PointCloud, ReconstructionStats) {
        reconstruct_par(frame, &self.params, &self.inverse, &self.indices)
    }

    /// Current fingerprint, or `""` with no asset.
    pub fn fingerprint(&self) -> &str {
        self.asset.as_ref().map_or("", |a| a.fingerprint().as_str())
    }

    pub fn asset(&self) -> Option<&VideoAsset> {
        self.asset.as_ref()
    }

    pub fn params(&self) -> &ViewParameters {
        &self.params
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn range_box(&self) -> &RangeBox {
        &self.range_box
    }

    pub fn inverse_intrinsics(&self) -> &InverseIntrinsics {
        &self.inverse
    }

    pub fn point_count(&self) -> usize {
        self.point_count
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Latest progress of the current load.
    pub fn progress(&self) -> Option<DownloadProgress> {
        self.progress
    }

    /// Failure of the most recent load, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// Parse, fingerprint and open fetched bytes.
fn prepare(
    url: String,
    bytes: Vec<u8>,
    backend: &dyn MediaBackend,
) -> Result<LoadedMedia, PlayerError> {
    let metadata = rgbd_data::parse(&bytes)?;
    let session = backend.open(&bytes)?;
    Ok(LoadedMedia {
        asset: VideoAsset::new(url, bytes, metadata),
        session,
    })
}
