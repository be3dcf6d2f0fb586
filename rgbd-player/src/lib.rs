//! RGBD Player
//!
//! Ties acquisition, metadata and reconstruction together around a single
//! active video:
//!
//! - [`AssetController`]: loads, supersession, live parameters, playback
//! - [`SettingsStore`]: per-fingerprint parameter persistence
//! - [`MediaBackend`] / [`Playback`]: the seam to an external video decoder
//! - [`PlayerConfig`]: JSON configuration for the command line

pub mod asset;
pub mod config;
pub mod controller;
pub mod errors;
pub mod playback;
pub mod settings;

pub use asset::VideoAsset;
pub use config::PlayerConfig;
pub use controller::{AssetController, LoadTicket, INITIAL_SEEK};
pub use errors::PlayerError;
pub use playback::{
    FrameReady, MediaBackend, MediaSession, Playback, StillBackend, StillPlayback, VideoSize,
};
pub use settings::{JsonFileSettings, MemorySettings, SettingsMap, SettingsStore};
