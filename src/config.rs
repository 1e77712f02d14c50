//! TOML configuration.
//!
//! Every field has a default, so a missing file or a partial one is fine:
//!
//! ```toml
//! log_file = "/tmp/inspektr.log"
//!
//! [midi]
//! client_name = "inspektr"
//! virtual_port_name = "Inspektr Virtual Port"
//! ignore_timing = true
//!
//! [hid]
//! poll_interval_ms = 100
//! join_timeout_ms = 1000
//! read_buffer_len = 64
//!
//! [display]
//! max_lines = 1000
//! show_timestamps = true
//! interpret_midi = true
//! ```

use crate::hid::PollSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where TUI mode writes its log; defaults to the temp directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    pub midi: MidiConfig,
    pub hid: HidConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MidiConfig {
    /// Client name registered with the MIDI subsystem
    pub client_name: String,
    /// Base name for ports created with "create virtual port"
    pub virtual_port_name: String,
    /// Drop clock and active sensing messages
    pub ignore_timing: bool,
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            client_name: "inspektr".to_string(),
            virtual_port_name: "Inspektr Virtual Port".to_string(),
            ignore_timing: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HidConfig {
    pub poll_interval_ms: u64,
    pub join_timeout_ms: u64,
    pub read_buffer_len: usize,
}

impl Default for HidConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            join_timeout_ms: 1000,
            read_buffer_len: 64,
        }
    }
}

/// Shortest wait for a poll thread to stop before it is abandoned
const MIN_JOIN_TIMEOUT_MS: u64 = 50;

impl HidConfig {
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            join_timeout: Duration::from_millis(self.join_timeout_ms.max(MIN_JOIN_TIMEOUT_MS)),
            read_buffer_len: self.read_buffer_len.max(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Lines kept in the monitor before the oldest are dropped
    pub max_lines: usize,
    pub show_timestamps: bool,
    pub interpret_midi: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_lines: 1000,
            show_timestamps: true,
            interpret_midi: true,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Loads `path` if given, otherwise returns the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("inspektr.log"))
    }
}
