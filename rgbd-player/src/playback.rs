//! Seams to the external video decoder.
//!
//! The player never decodes video itself. A [`MediaBackend`] turns the fetched
//! bytes into a [`MediaSession`]: a playback handle plus a one-shot notice
//! carrying the decoded frame size once the first frame is available.

use crate::errors::PlayerError;
use std::time::Duration;
use tokio::sync::oneshot;

/// Decoded (stored) frame size. The logical size is half as wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoSize {
    pub width: u32,
    pub height: u32,
}

impl VideoSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of logical points, `(width / 2) * height`.
    pub fn point_count(&self) -> usize {
        (self.width / 2) as usize * self.height as usize
    }
}

/// Single-subscriber "frame ready" notification.
pub type FrameReady = oneshot::Receiver<VideoSize>;

/// Transport controls of an open video.
pub trait Playback: Send {
    fn play(&mut self);
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);
    /// Total length, when the decoder knows it.
    fn duration(&self) -> Option<Duration>;
    fn seek(&mut self, position: Duration);
}

/// An opened video.
pub struct MediaSession {
    pub playback: Box<dyn Playback>,
    pub frame_ready: FrameReady,
}

/// Opens fetched video bytes for playback.
pub trait MediaBackend: Send + Sync {
    fn open(&self, bytes: &[u8]) -> Result<MediaSession, PlayerError>;
}

/// Playback state of a video that never advances.
#[derive(Debug)]
pub struct StillPlayback {
    paused: bool,
    muted: bool,
    duration: Option<Duration>,
    // Keeps the frame-ready channel open when the size is never reported.
    _pending: Option<oneshot::Sender<VideoSize>>,
}

impl Playback for StillPlayback {
    fn play(&mut self) {
        self.paused = false;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    // The same frame is shown at every position.
    fn seek(&mut self, _position: Duration) {}
}

/// Backend for a single already-decoded frame.
///
/// Used by the command line, which is handed frames as images instead of
/// decoding the video. With a size, frame ready fires as soon as the video is
/// opened; without one, it never fires.
#[derive(Debug, Clone, Default)]
pub struct StillBackend {
    size: Option<VideoSize>,
    duration: Option<Duration>,
}

impl StillBackend {
    pub fn new(size: Option<VideoSize>) -> Self {
        Self {
            size,
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

impl MediaBackend for StillBackend {
    fn open(&self, bytes: &[u8]) -> Result<MediaSession, PlayerError> {
        if bytes.is_empty() {
            return Err(PlayerError::Media("empty video".to_string()));
        }
        let (tx, rx) = oneshot::channel();
        let pending = match self.size {
            Some(size) => {
                // Receiver is returned below, so this cannot fail.
                let _ = tx.send(size);
                None
            }
            None => Some(tx),
        };
        Ok(MediaSession {
            playback: Box::new(StillPlayback {
                paused: true,
                muted: true,
                duration: self.duration,
                _pending: pending,
            }),
            frame_ready: rx,
        })
    }
}
