//! Common acquisition types and traits.

use std::io::Read;
use thiserror::Error;

/// Errors that can occur while acquiring bytes.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Request failed for {url}: {reason}")]
    RequestFailed { url: String, reason: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Response for {0} has no body")]
    MissingBody(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw response from a transport, before any status checks.
pub struct TransportResponse {
    /// HTTP-style status code (file transports report 200).
    pub status: u16,
    /// Declared body length, if the transport knows it.
    pub content_length: Option<u64>,
    /// Body stream. `None` when the transport produced no body at all.
    pub body: Option<Box<dyn Read + Send>>,
}

impl TransportResponse {
    /// Successful response over an in-memory or streaming body.
    pub fn ok(content_length: Option<u64>, body: Box<dyn Read + Send>) -> Self {
        Self {
            status: 200,
            content_length,
            body: Some(body),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Trait for sources that can open a URL and stream its body.
///
/// Implementations block; async callers run them on a blocking pool.
pub trait Transport: Send + Sync {
    /// Open `url` and return the raw response.
    fn open(&self, url: &str) -> Result<TransportResponse, CaptureError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn open(&self, url: &str) -> Result<TransportResponse, CaptureError> {
        (**self).open(url)
    }
}
