//! Metadata extraction from raw RGBD video bytes
//!
//! An RGBD file is an ordinary video container with a JSON object appended at
//! the end. This module finds that object, turns its calibration into
//! [`Intrinsics`](crate::Intrinsics), and fingerprints the file so settings and
//! caches can be keyed by content.

mod fingerprint;
mod trailer;

pub use fingerprint::{fingerprint, sha256_hex, Fingerprint, FINGERPRINT_PREFIX_LEN};
pub use trailer::{parse_trailer, TrailerMetadata, TRAILER_MARKER};

use thiserror::Error;
use tracing::debug;

/// Errors raised while reading the metadata trailer.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Metadata marker not found in {0} bytes")]
    MarkerNotFound(usize),

    #[error("Malformed metadata JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Metadata trailer is empty")]
    Empty,

    #[error("intrinsicMatrix must have 9 elements, found {0}")]
    WrongElementCount(usize),

    #[error("intrinsicMatrix is degenerate: {0}")]
    Degenerate(String),
}

/// Everything the player needs to know about a file before decoding it.
#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub fingerprint: Fingerprint,
    pub trailer: TrailerMetadata,
}

/// Parse the trailer and fingerprint the file in one pass over the bytes.
#[tracing::instrument(skip_all, fields(len = bytes.len()))]
pub fn parse(bytes: &[u8]) -> Result<VideoMetadata, MetadataError> {
    let trailer = parse_trailer(bytes)?;
    let fingerprint = fingerprint(bytes);
    debug!(
        "Parsed metadata: fingerprint {}, fx {:.2}, fy {:.2}",
        fingerprint,
        trailer.intrinsics.fx(),
        trailer.intrinsics.fy()
    );
    Ok(VideoMetadata {
        fingerprint,
        trailer,
    })
}
