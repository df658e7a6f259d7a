// Grid settings
// Loaded from ~/.config/careshift/grid.toml

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use careshift_engine::RateTable;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum ConfigError {
    /// File read/write error
    Io(String),
    /// TOML parse / deserialization error
    Parse(String),
    /// TOML serialization error
    Serialize(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::Serialize(msg) => write!(f, "config serialize error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Persistence and echo-suppression timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// A cell keeps its local state this long after a local write, whatever
    /// the remote feed says
    pub suppression_window_ms: u64,
    /// Debounce for drag moves and rapid edits
    pub debounce_ms: u64,
    pub payroll_debounce_ms: u64,
    /// Attempts per write before it is reported as failed
    pub retry_attempts: u32,
    /// First retry delay; doubles on each further attempt
    pub retry_backoff_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            suppression_window_ms: 2000,
            debounce_ms: 800,
            payroll_debounce_ms: 800,
            retry_attempts: 3,
            retry_backoff_ms: 200,
        }
    }
}

impl SyncSettings {
    pub fn suppression_window(&self) -> Duration {
        Duration::from_millis(self.suppression_window_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn payroll_debounce(&self) -> Duration {
        Duration::from_millis(self.payroll_debounce_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Undo groups kept
    pub limit: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { limit: 100 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub sync: SyncSettings,
    pub history: HistorySettings,
    pub rates: RateTable,
}

impl GridSettings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("careshift")
            .join("grid.toml")
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return settings;
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{}: {}; using default settings", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Save current settings to `path`
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        let toml = self.to_toml_string()?;
        fs::write(path, toml).map_err(|e| ConfigError::Io(e.to_string()))
    }

    fn create_default_file(&self, path: &Path) {
        let body = match self.to_toml_string() {
            Ok(body) => body,
            Err(e) => {
                log::warn!("cannot render default settings: {}", e);
                return;
            }
        };
        let contents = format!(
            "# careshift grid settings\n\
             # Times are milliseconds. Rates are yen per hour, keyed by service code.\n\n{body}"
        );
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("error creating config directory: {}", e);
                return;
            }
        }
        if let Err(e) = fs::write(path, contents) {
            log::warn!("error writing default {}: {}", path.display(), e);
        }
    }
}
