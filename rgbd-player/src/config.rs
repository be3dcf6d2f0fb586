//! Player configuration file.

use crate::errors::PlayerError;
use crate::settings::JsonFileSettings;
use rgbd_capture::DiskCache;
use rgbd_cloud::ViewParameters;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loaded from a JSON file.
///
/// Every field is optional in the file; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerConfig {
    /// Whether downloaded videos are cached on disk
    pub cache_enabled: bool,
    /// Cache directory; the platform cache directory when unset
    pub cache_dir: Option<PathBuf>,
    /// Settings file; the platform config directory when unset
    pub settings_path: Option<PathBuf>,
    /// Parameters for videos with nothing stored
    pub defaults: ViewParameters,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_dir: None,
            settings_path: None,
            defaults: ViewParameters::default(),
        }
    }
}

impl PlayerConfig {
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, PlayerError> {
        let text = fs::read_to_string(path)?;
        let config: PlayerConfig = serde_json::from_str(&text)
            .map_err(|e| PlayerError::Config(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded config {:?}", config);
        Ok(config)
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, PlayerError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Disk cache to use, if caching is enabled and a directory is known.
    pub fn disk_cache(&self) -> Option<DiskCache> {
        if !self.cache_enabled {
            return None;
        }
        self.cache_dir
            .clone()
            .or_else(DiskCache::default_root)
            .map(DiskCache::new)
    }

    pub fn settings_path(&self) -> Option<PathBuf> {
        self.settings_path
            .clone()
            .or_else(JsonFileSettings::default_path)
    }
}
