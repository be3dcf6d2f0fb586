//! Error types for player operations.

use rgbd_capture::CaptureError;
use rgbd_cloud::FrameError;
use rgbd_data::MetadataError;
use thiserror::Error;

/// Errors that can occur while loading or playing an RGBD video.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Acquisition error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Media backend error: {0}")]
    Media(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Load was superseded by a newer load")]
    Superseded,

    #[error("Load failed: {0}")]
    LoadFailed(String),

    #[error("Load task failed: {0}")]
    Task(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
