//! Per-asset persisted view parameters, keyed by content fingerprint.

use crate::errors::PlayerError;
use rgbd_cloud::reconstruction::{ParamName, ViewParameters};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Parameter name to last value, for one fingerprint.
pub type SettingsMap = Map<String, Value>;

/// Storage for parameters remembered per asset.
pub trait SettingsStore: Send + Sync {
    /// Everything stored for `fingerprint`; empty when nothing is stored.
    fn get(&self, fingerprint: &str) -> SettingsMap;

    /// Remember `value` for parameter `name` of `fingerprint`.
    fn set(&self, fingerprint: &str, name: &str, value: Value) -> Result<(), PlayerError>;
}

impl<T: SettingsStore + ?Sized> SettingsStore for Arc<T> {
    fn get(&self, fingerprint: &str) -> SettingsMap {
        (**self).get(fingerprint)
    }

    fn set(&self, fingerprint: &str, name: &str, value: Value) -> Result<(), PlayerError> {
        (**self).set(fingerprint, name, value)
    }
}

/// In-process settings. Lost when dropped.
#[derive(Debug, Default)]
pub struct MemorySettings {
    entries: Mutex<HashMap<String, SettingsMap>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, fingerprint: &str) -> SettingsMap {
        self.entries
            .lock()
            .ok()
            .and_then(|e| e.get(fingerprint).cloned())
            .unwrap_or_default()
    }

    fn set(&self, fingerprint: &str, name: &str, value: Value) -> Result<(), PlayerError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PlayerError::Settings("settings lock poisoned".to_string()))?;
        entries
            .entry(fingerprint.to_string())
            .or_default()
            .insert(name.to_string(), value);
        Ok(())
    }
}

/// Settings kept in a single JSON file: `{ fingerprint: { name: value } }`.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `settings.json` under the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rgbd-player").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>, PlayerError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(Map::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, all: &Map<String, Value>) -> Result<(), PlayerError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let partial = self.path.with_extension("json.partial");
        fs::write(&partial, serde_json::to_vec_pretty(all)?)?;
        fs::rename(&partial, &self.path)?;
        Ok(())
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, fingerprint: &str) -> SettingsMap {
        let _guard = self.lock.lock();
        match self.read_all() {
            Ok(mut all) => match all.remove(fingerprint) {
                Some(Value::Object(map)) => map,
                Some(_) => {
                    warn!("Ignoring non-object settings entry for {}", fingerprint);
                    SettingsMap::new()
                }
                None => SettingsMap::new(),
            },
            Err(e) => {
                warn!("Failed to read settings {}: {}", self.path.display(), e);
                SettingsMap::new()
            }
        }
    }

    fn set(&self, fingerprint: &str, name: &str, value: Value) -> Result<(), PlayerError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| PlayerError::Settings("settings lock poisoned".to_string()))?;
        let mut all = self.read_all()?;
        let entry = all
            .entry(fingerprint.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(name.to_string(), value);
        }
        self.write_all(&all)
    }
}

/// Current value of `name` as a JSON scalar.
pub fn param_value(params: &ViewParameters, name: ParamName) -> Value {
    match name {
        ParamName::PointSize => Value::from(params.point_size()),
        ParamName::RangeNear => Value::from(params.range_near()),
        ParamName::RangeFar => Value::from(params.range_far()),
        ParamName::Flatness => Value::from(params.flatness()),
        ParamName::Scale => Value::from(params.scale()),
        ParamName::ShowDepthMap => Value::from(params.show_depth_map()),
    }
}

/// Apply stored values through the regular setters, so stored ranges are
/// clamped like any other write. Unknown names and mistyped values are skipped.
pub fn apply_settings(params: &mut ViewParameters, stored: &SettingsMap) {
    for name in ParamName::ALL {
        let Some(value) = stored.get(name.as_str()) else {
            continue;
        };
        if name.is_bool() {
            match value.as_bool() {
                Some(v) => params.set_show_depth_map(v),
                None => debug!("Ignoring stored {} = {}", name, value),
            }
            continue;
        }
        let Some(v) = value.as_f64().map(|v| v as f32) else {
            debug!("Ignoring stored {} = {}", name, value);
            continue;
        };
        match name {
            ParamName::PointSize => params.set_point_size(v),
            ParamName::RangeNear => params.set_range_near(v),
            ParamName::RangeFar => params.set_range_far(v),
            ParamName::Flatness => params.set_flatness(v),
            ParamName::Scale => params.set_scale(v),
            ParamName::ShowDepthMap => {}
        }
    }
}
