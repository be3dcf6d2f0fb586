//! Byte caches consulted before the network.

use crate::source::CaptureError;
use rgbd_data::metadata::sha256_hex;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Key-value store for downloaded bodies, keyed by URL.
pub trait ByteCache: Send + Sync {
    /// Cached bytes for `key`, if any.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `bytes` under `key`, replacing any previous entry.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), CaptureError>;
}

/// In-process cache. Entries live as long as the cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ByteCache for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), CaptureError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CaptureError::Cache("memory cache lock poisoned".to_string()))?;
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// One file per entry under a directory. File names are the SHA-256 of the key.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    /// Use `root` as the cache directory. It is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Platform cache directory for this application.
    pub fn default_root() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("rgbd-player").join("videos"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(sha256_hex(key.as_bytes()))
    }
}

impl ByteCache for DiskCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let path = self.entry_path(key);
        match fs::read(&path) {
            Ok(bytes) => {
                debug!("Cache hit for {} ({} bytes)", key, bytes.len());
                Some(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), CaptureError> {
        fs::create_dir_all(&self.root)?;
        let path = self.entry_path(key);
        // Write then rename so readers never observe a partial entry.
        let partial = path.with_extension("partial");
        fs::write(&partial, bytes)?;
        fs::rename(&partial, &path)?;
        debug!("Cached {} bytes for {}", bytes.len(), key);
        Ok(())
    }
}
