//! RGBD Capture - Byte acquisition for RGBD video files
//!
//! This crate fetches the raw bytes of an RGBD video:
//!
//! - Transports for HTTP(S) (via ureq) and local files
//! - Byte caches (in-memory, on-disk) consulted before the network
//! - Download progress that is monotonic and ends with exactly one `1.0`
//!
//! ## Example
//!
//! ```ignore
//! use rgbd_capture::{fetch, AnyTransport, DiskCache, FetchOptions};
//!
//! let cache = DiskCache::new("/tmp/rgbd-cache");
//! let mut report = |p: rgbd_capture::DownloadProgress| println!("{:.0}%", p.progress * 100.0);
//! let bytes = fetch(
//!     &AnyTransport::new(),
//!     "https://example.com/clip.mp4",
//!     FetchOptions::default().with_cache(&cache).with_progress(&mut report),
//! )?;
//! ```

mod cache;
mod fetch;
mod progress;
mod source;
mod transport;

pub use cache::{ByteCache, DiskCache, MemoryCache};
pub use fetch::{fetch, FetchOptions};
pub use progress::{DownloadProgress, ProgressTracker, UNKNOWN_LENGTH_TIME_CONSTANT};
pub use source::{CaptureError, Transport, TransportResponse};
pub use transport::{AnyTransport, FileTransport, HttpTransport};
