//! Configuration management for the relay.
//!
//! Settings come from an optional TOML file. Every field has a default, so an
//! empty file and a missing file both produce a working configuration.

use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "ARCADE_RELAY_CONFIG";

/// File looked up in the working directory when the variable is unset.
pub const DEFAULT_CONFIG_FILE: &str = "relay.toml";

fn default_level() -> String {
    "info".to_string()
}

fn default_thread_name() -> String {
    "arcade-relay".to_string()
}

fn default_commit_warn_ms() -> u64 {
    500
}

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Worker thread configuration settings
    #[serde(default)]
    pub worker: WorkerSettings,
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error), overridden by `RUST_LOG`
    #[serde(default = "default_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            json_format: false,
        }
    }
}

/// Worker thread configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// OS-level name of the worker thread
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
    /// Idle wake interval in milliseconds (0 waits until notified)
    #[serde(default)]
    pub idle_wake_ms: u64,
    /// Host commit callbacks slower than this are logged as warnings
    #[serde(default = "default_commit_warn_ms")]
    pub commit_warn_ms: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            thread_name: default_thread_name(),
            idle_wake_ms: 0,
            commit_warn_ms: default_commit_warn_ms(),
        }
    }
}

impl WorkerSettings {
    /// The bounded idle wait, if one is configured.
    pub fn idle_wake(&self) -> Option<Duration> {
        (self.idle_wake_ms > 0).then(|| Duration::from_millis(self.idle_wake_ms))
    }

    pub fn commit_warn(&self) -> Duration {
        Duration::from_millis(self.commit_warn_ms)
    }
}

impl RelayConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, RelayError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads a configuration file, failing if it is missing or malformed.
    pub fn load(path: &Path) -> Result<Self, RelayError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Resolves the config file location from the environment.
    pub fn discover_path() -> Option<PathBuf> {
        if let Some(explicit) = std::env::var_os(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(explicit));
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
        fallback.exists().then_some(fallback)
    }

    /// Loads whatever configuration is available, falling back to defaults.
    ///
    /// Used at the host boundary, where a bad file must never stop the plugin
    /// from loading.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::discover_path() else {
            return Self::default();
        };
        match Self::load(&path) {
            Ok(config) => {
                info!("🔧 Loaded relay configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("⚠️ Ignoring relay configuration {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
