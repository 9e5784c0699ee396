//! Gamebook configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GamebookConfig {
    /// Storage backend configuration
    pub storage: StorageConfig,
    /// Save slot configuration
    pub saves: SaveConfig,
    /// Page transition configuration
    pub transitions: TransitionConfig,
}

impl GamebookConfig {
    /// Load from a JSON file; absent sections and fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the file-backed store
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("saves"),
        }
    }
}

/// Save slot configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// Seconds between auto-saves to the current slot
    pub auto_save_interval_secs: u64,
}

impl SaveConfig {
    pub fn auto_save_interval(&self) -> Duration {
        // A zero period would make the timer spin
        Duration::from_secs(self.auto_save_interval_secs.max(1))
    }
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            auto_save_interval_secs: 5 * 60,
        }
    }
}

/// Transition configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Duration used when a transition does not specify one
    pub default_duration_ms: u64,
}

impl TransitionConfig {
    pub fn default_duration(&self) -> Duration {
        Duration::from_millis(self.default_duration_ms)
    }
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: 500,
        }
    }
}
