//! Fetching a URL into memory, through an optional cache, with progress.

use crate::cache::ByteCache;
use crate::progress::{DownloadProgress, ProgressTracker};
use crate::source::{CaptureError, Transport};
use std::io::{ErrorKind, Read};
use std::time::Instant;
use tracing::{debug, info, warn};

const CHUNK_SIZE: usize = 64 * 1024;

/// Optional collaborators for [`fetch`].
#[derive(Default)]
pub struct FetchOptions<'a> {
    /// Checked before the transport; filled after a successful download.
    pub cache: Option<&'a dyn ByteCache>,
    /// Receives monotonic progress ending with exactly one `1.0`.
    pub on_progress: Option<&'a mut dyn FnMut(DownloadProgress)>,
}

impl<'a> FetchOptions<'a> {
    pub fn with_cache(mut self, cache: &'a dyn ByteCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_progress(mut self, on_progress: &'a mut dyn FnMut(DownloadProgress)) -> Self {
        self.on_progress = Some(on_progress);
        self
    }
}

/// Fetch the full body of `url`.
///
/// Non-success statuses and missing bodies are errors; nothing is ever
/// substituted for a failed download.
#[tracing::instrument(skip_all, fields(url = %url))]
pub fn fetch(
    transport: &dyn Transport,
    url: &str,
    options: FetchOptions<'_>,
) -> Result<Vec<u8>, CaptureError> {
    let FetchOptions { cache, on_progress } = options;

    if let Some(bytes) = cache.and_then(|c| c.get(url)) {
        debug!("Serving {} bytes from cache", bytes.len());
        if let Some(on_progress) = on_progress {
            let mut tracker = ProgressTracker::new(Some(bytes.len() as u64), Instant::now());
            if let Some(done) = tracker.finish(bytes.len() as u64) {
                on_progress(done);
            }
        }
        return Ok(bytes);
    }

    let response = transport.open(url)?;
    if !response.is_success() {
        warn!("Request for {} returned HTTP {}", url, response.status);
        return Err(CaptureError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }
    let content_length = response.content_length;
    let body = response
        .body
        .ok_or_else(|| CaptureError::MissingBody(url.to_string()))?;

    let bytes = match on_progress {
        Some(on_progress) => read_with_progress(body, content_length, on_progress)?,
        None => read_all(body, content_length)?,
    };
    info!("Fetched {} bytes", bytes.len());

    if let Some(cache) = cache {
        if let Err(e) = cache.put(url, &bytes) {
            warn!("Failed to cache {}: {}", url, e);
        }
    }
    Ok(bytes)
}

fn read_all(mut body: Box<dyn Read + Send>, hint: Option<u64>) -> Result<Vec<u8>, CaptureError> {
    let mut bytes = Vec::with_capacity(capacity_hint(hint));
    body.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn read_with_progress(
    mut body: Box<dyn Read + Send>,
    total: Option<u64>,
    on_progress: &mut dyn FnMut(DownloadProgress),
) -> Result<Vec<u8>, CaptureError> {
    let mut tracker = ProgressTracker::new(total, Instant::now());
    let mut bytes = Vec::with_capacity(capacity_hint(total));
    let mut chunk = vec![0u8; CHUNK_SIZE];

    loop {
        let n = match body.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        bytes.extend_from_slice(&chunk[..n]);
        if let Some(progress) = tracker.update(bytes.len() as u64, Instant::now()) {
            on_progress(progress);
        }
    }

    if let Some(done) = tracker.finish(bytes.len() as u64) {
        on_progress(done);
    }
    Ok(bytes)
}

fn capacity_hint(hint: Option<u64>) -> usize {
    // Declared lengths are untrusted; cap the up-front allocation.
    hint.map(|h| h.min(256 * 1024 * 1024) as usize).unwrap_or(0)
}
