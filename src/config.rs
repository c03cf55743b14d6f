use std::collections::HashMap;
use std::fs::create_dir_all;
use std::path::PathBuf;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Key under which the settings record is persisted.
pub const SETTINGS_KEY: &str = "jsonHandleSettings";

const MAX_COLLAPSE_THRESHOLD: f64 = 10_000.0;
const MIN_JSON_SIZE_MB: f64 = 1.0;
const MAX_JSON_SIZE_MB: f64 = 100.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Auto,
    Light,
    Dark,
}

impl Theme {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "auto" => Some(Theme::Auto),
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

/// User preferences shared by the popup and every page renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub theme: Theme,
    pub collapse_threshold: usize,
    #[serde(rename = "maxJsonSizeMB")]
    pub max_json_size_mb: f64,
    pub show_stats: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Auto,
            collapse_threshold: 50,
            max_json_size_mb: 10.0,
            show_stats: true,
        }
    }
}

impl Settings {
    /// Normalize an untrusted record field by field. Invalid or out-of-range
    /// values fall back to (or clamp toward) the defaults; unknown fields are ignored.
    pub fn normalize(raw: &Value) -> Self {
        let defaults = Settings::default();
        let field = |name: &str| raw.get(name);

        let theme = match field("theme").and_then(Value::as_str).and_then(Theme::parse) {
            Some(theme) => theme,
            None => {
                if field("theme").is_some() {
                    warn!(value = ?field("theme"), "unknown theme, using default");
                }
                defaults.theme
            }
        };

        let collapse_threshold = clamp_number(field("collapseThreshold"), 0.0, MAX_COLLAPSE_THRESHOLD)
            .map(|n| n as usize)
            .unwrap_or(defaults.collapse_threshold);

        let max_json_size_mb = clamp_number(field("maxJsonSizeMB"), MIN_JSON_SIZE_MB, MAX_JSON_SIZE_MB)
            .unwrap_or(defaults.max_json_size_mb);

        // only an explicit `false` turns stats off
        let show_stats = !matches!(field("showStats"), Some(Value::Bool(false)));

        Settings { theme, collapse_threshold, max_json_size_mb, show_stats }
    }

    pub fn max_json_size_bytes(&self) -> usize {
        (self.max_json_size_mb * 1024.0 * 1024.0) as usize
    }
}

// Numbers and numeric strings are accepted; anything non-finite is rejected.
fn clamp_number(raw: Option<&Value>, min: f64, max: f64) -> Option<f64> {
    let n = match raw? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then(|| n.clamp(min, max))
}

/// Key/value storage the settings record lives in.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> Result<()>;
}

pub fn load_settings(store: &dyn SettingsStore) -> Settings {
    match store.get(SETTINGS_KEY) {
        Ok(Some(raw)) => Settings::normalize(&raw),
        Ok(None) => {
            debug!("no stored settings, using defaults");
            Settings::default()
        }
        Err(e) => {
            warn!("failed to read settings: {}", e);
            Settings::default()
        }
    }
}

pub fn save_settings(store: &dyn SettingsStore, settings: &Settings) -> Result<()> {
    store.set(SETTINGS_KEY, serde_json::to_value(settings)?)
}

/// In-process store, used when embedding and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }
}

/// JSON object on disk, one top-level member per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `settings.json` under the platform config directory.
    pub fn in_config_dir() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::new(dir.join("json-handle").join("settings.json")))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_all(&self) -> Result<serde_json::Map<String, Value>> {
        if !self.path.exists() {
            return Ok(serde_json::Map::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|source| Error::Io {
            path: self.path.clone(),
            source,
        })?;
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Ok(serde_json::Map::new()),
        }
    }
}

impl SettingsStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut all = self.read_all()?;
        all.insert(key.to_string(), value);

        if let Some(dir) = self.path.parent() {
            // Ensure the directory exists
            create_dir_all(dir).map_err(|source| Error::Io { path: dir.to_path_buf(), source })?;
        }
        let content = serde_json::to_string_pretty(&Value::Object(all))?;
        std::fs::write(&self.path, content).map_err(|source| Error::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Timing and capacity knobs of the background observer.
#[derive(Debug, Clone)]
pub struct ObserverConfig {
    /// Wait before the first delivery so a fresh page can finish starting up.
    pub dispatch_delay: Duration,
    pub delivery_timeout: Duration,
    pub detection_ttl: Duration,
    pub detection_capacity: usize,
    pub failure_cooldown: Duration,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            dispatch_delay: Duration::from_millis(500),
            delivery_timeout: Duration::from_secs(3),
            detection_ttl: Duration::from_secs(30),
            detection_capacity: 500,
            failure_cooldown: Duration::from_secs(5),
        }
    }
}

/// Fixed behaviour of the in-page viewer that is not user-configurable.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub search_debounce: Duration,
    pub max_search_results: usize,
    pub preview_len: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(300),
            max_search_results: 1000,
            preview_len: 120,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
