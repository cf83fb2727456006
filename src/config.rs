//! Configuration module for BioVis-RS
//!
//! Holds the persistent application configuration: the last used device
//! address, sampling rate and recording type, plus the acquisition tunables.
//! Configuration is stored as TOML in the platform-appropriate location:
//!
//! - **Linux**: `~/.config/dev.biovis.biovis-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.biovis.biovis-rs/config.toml`
//! - **Windows**: `%APPDATA%\dev.biovis.biovis-rs\config.toml`

use crate::error::{BioVisError, Result};
use crate::types::{RecordingType, SamplingRate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application identifier for config directories
pub const APP_ID: &str = "dev.biovis.biovis-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default hard cap on a single acquisition, in seconds
pub const DEFAULT_MAX_DURATION_SECS: u64 = 120;

/// Default number of frames requested per blocking device read
pub const DEFAULT_READ_BLOCK_SIZE: usize = 10;

/// Tunables for the acquisition session
///
/// The duration cap and block size are deliberately configurable rather than
/// hard-coded device constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionSettings {
    /// Hard cap on a single acquisition in seconds; the reader stops
    /// autonomously when it is reached
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,

    /// Number of frames requested per blocking `read_batch` call
    #[serde(default = "default_read_block_size")]
    pub read_block_size: usize,
}

fn default_max_duration_secs() -> u64 {
    DEFAULT_MAX_DURATION_SECS
}

fn default_read_block_size() -> usize {
    DEFAULT_READ_BLOCK_SIZE
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
            read_block_size: DEFAULT_READ_BLOCK_SIZE,
        }
    }
}

impl AcquisitionSettings {
    /// Duration cap as a `Duration`
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }
}

/// Persistent application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Device hardware address (MAC format `XX:XX:XX:XX:XX:XX`)
    #[serde(default)]
    pub device_address: String,

    /// Selected sampling rate
    #[serde(default)]
    pub sampling_rate: SamplingRate,

    /// Selected recording type (determines the sampled channel)
    #[serde(default)]
    pub recording_type: RecordingType,

    /// Acquisition tunables
    #[serde(default)]
    pub acquisition: AcquisitionSettings,
}

/// Get the application config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

impl AppConfig {
    /// Load the config from disk, falling back to defaults on any failure
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to parse config at {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Save the config to disk, creating the config directory if needed
    pub fn save(&self) -> Result<()> {
        let dir = config_dir()
            .ok_or_else(|| BioVisError::Config("Could not determine config directory".into()))?;
        if !dir.exists() {
            std::fs::create_dir_all(&dir)
                .map_err(|e| BioVisError::Config(format!("Failed to create {:?}: {}", dir, e)))?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| BioVisError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(dir.join(CONFIG_FILE), contents)?;
        Ok(())
    }
}
