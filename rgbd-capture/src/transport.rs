//! HTTP and filesystem transports.

use crate::source::{CaptureError, Transport, TransportResponse};
use std::fs::File;
use std::path::PathBuf;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("rgbd-player/", env!("CARGO_PKG_VERSION"));

/// Blocking HTTP(S) transport backed by ureq.
#[derive(Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().user_agent(USER_AGENT).build(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &str) -> Result<TransportResponse, CaptureError> {
        info!("GET {}", url);
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            // Non-2xx statuses come back as errors; surface them as a status so
            // the caller reports them uniformly.
            Err(ureq::Error::Status(status, _)) => {
                return Ok(TransportResponse {
                    status,
                    content_length: None,
                    body: None,
                });
            }
            Err(e) => {
                return Err(CaptureError::RequestFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let status = response.status();
        let content_length = response
            .header("Content-Length")
            .and_then(|v| v.trim().parse::<u64>().ok());
        debug!("HTTP {} content-length {:?}", status, content_length);

        Ok(TransportResponse {
            status,
            content_length,
            body: Some(Box::new(response.into_reader())),
        })
    }
}

/// Serves `file://` URLs and plain paths from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTransport;

impl FileTransport {
    /// Resolve a `file://` URL or plain path.
    pub fn path_for(url: &str) -> PathBuf {
        PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
    }
}

impl Transport for FileTransport {
    fn open(&self, url: &str) -> Result<TransportResponse, CaptureError> {
        let path = Self::path_for(url);
        debug!("Opening {}", path.display());
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        Ok(TransportResponse::ok(Some(len), Box::new(file)))
    }
}

/// Dispatches on the URL scheme: `http(s)://` goes to the network, anything
/// else to the filesystem.
#[derive(Clone, Default)]
pub struct AnyTransport {
    http: HttpTransport,
    file: FileTransport,
}

impl AnyTransport {
    pub fn new() -> Self {
        Self {
            http: HttpTransport::new(),
            file: FileTransport,
        }
    }

    pub fn is_remote(url: &str) -> bool {
        let lower = url.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }
}

impl Transport for AnyTransport {
    fn open(&self, url: &str) -> Result<TransportResponse, CaptureError> {
        if Self::is_remote(url) {
            self.http.open(url)
        } else {
            self.file.open(url)
        }
    }
}
