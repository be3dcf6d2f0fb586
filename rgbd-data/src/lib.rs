//! RGBD Data Crate
//!
//! Calibration and metadata utilities for hue-encoded RGBD video files.
//! This crate is GPU-agnostic and never decodes pixels; it deals with the
//! appended metadata trailer, camera intrinsics and content fingerprints.

pub mod metadata;
pub mod types;

pub use metadata::{
    fingerprint, parse, parse_trailer, Fingerprint, MetadataError, TrailerMetadata, VideoMetadata,
};
pub use types::{InverseIntrinsics, Intrinsics};
