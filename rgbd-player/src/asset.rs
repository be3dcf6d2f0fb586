//! The loaded video and everything derived from it.

use crate::playback::VideoSize;
use rgbd_data::{Fingerprint, InverseIntrinsics, Intrinsics, VideoMetadata};
use serde_json::{Map, Value};

/// A successfully loaded RGBD video. Replaced wholesale by the next load.
#[derive(Debug, Clone)]
pub struct VideoAsset {
    url: String,
    bytes: Vec<u8>,
    fingerprint: Fingerprint,
    intrinsics: Intrinsics,
    inverse: InverseIntrinsics,
    extra: Map<String, Value>,
    size: Option<VideoSize>,
}

impl VideoAsset {
    pub fn new(url: impl Into<String>, bytes: Vec<u8>, metadata: VideoMetadata) -> Self {
        let VideoMetadata {
            fingerprint,
            trailer,
        } = metadata;
        Self {
            url: url.into(),
            bytes,
            fingerprint,
            inverse: trailer.intrinsics.inverse(),
            intrinsics: trailer.intrinsics,
            extra: trailer.extra,
            size: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    pub fn inverse(&self) -> &InverseIntrinsics {
        &self.inverse
    }

    /// Trailer fields other than the intrinsic matrix, verbatim.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Decoded frame size, once the media has reported it.
    pub fn size(&self) -> Option<VideoSize> {
        self.size
    }

    pub(crate) fn set_size(&mut self, size: VideoSize) {
        self.size = Some(size);
    }
}
