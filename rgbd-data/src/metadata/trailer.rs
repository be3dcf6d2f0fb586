//! JSON trailer appended to RGBD video files

use crate::metadata::MetadataError;
use crate::types::Intrinsics;
use glam::Mat3;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

/// Leading bytes of the trailer object.
pub const TRAILER_MARKER: &[u8] = b"{\"intrinsic";

// Trailer as stored on disk. Fields other than the matrix are kept verbatim.
#[derive(Deserialize, Debug)]
struct RawTrailer {
    #[serde(rename = "intrinsicMatrix")]
    intrinsic_matrix: Vec<f64>,
    #[serde(flatten)]
    extra: Map<String, JsonValue>,
}

/// Parsed trailer.
#[derive(Debug, Clone)]
pub struct TrailerMetadata {
    /// Calibration, already oriented as `K`.
    pub intrinsics: Intrinsics,
    /// Byte offset of the trailer object within the file.
    pub offset: usize,
    /// Remaining trailer fields, untouched.
    pub extra: Map<String, JsonValue>,
}

/// Locate and parse the trailer object.
///
/// The marker is searched from the end of the stream; the first complete JSON
/// value starting at the last occurrence is the trailer. Anything after that
/// value (padding, a terminator byte) is ignored.
pub fn parse_trailer(bytes: &[u8]) -> Result<TrailerMetadata, MetadataError> {
    let offset = find_marker(bytes).ok_or(MetadataError::MarkerNotFound(bytes.len()))?;
    debug!("Metadata trailer at byte {} of {}", offset, bytes.len());

    let raw: RawTrailer = serde_json::Deserializer::from_slice(&bytes[offset..])
        .into_iter::<RawTrailer>()
        .next()
        .ok_or(MetadataError::Empty)?
        .map_err(|e| {
            warn!("Failed to parse metadata trailer: {}", e);
            MetadataError::from(e)
        })?;

    let elements: [f64; 9] = raw
        .intrinsic_matrix
        .as_slice()
        .try_into()
        .map_err(|_| MetadataError::WrongElementCount(raw.intrinsic_matrix.len()))?;

    let intrinsics = intrinsics_from_stored(&elements);
    if !intrinsics.is_valid() {
        return Err(MetadataError::Degenerate(format!(
            "fx={}, fy={}, cx={}, cy={}",
            intrinsics.fx(),
            intrinsics.fy(),
            intrinsics.cx(),
            intrinsics.cy()
        )));
    }

    Ok(TrailerMetadata {
        intrinsics,
        offset,
        extra: raw.extra,
    })
}

/// The file stores `K` row-major but transposed: `[fx, 0, 0, 0, fy, 0, cx, cy, 1]`.
/// Transposing a row-major read is the same as a column-major read, which is
/// what glam does natively.
fn intrinsics_from_stored(elements: &[f64; 9]) -> Intrinsics {
    Intrinsics::from_matrix(Mat3::from_cols_array(&elements.map(|e| e as f32)))
}

fn find_marker(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < TRAILER_MARKER.len() {
        return None;
    }
    bytes
        .windows(TRAILER_MARKER.len())
        .rposition(|window| window == TRAILER_MARKER)
}
