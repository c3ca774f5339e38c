//! Resolved CLI configuration.
//!
//! Sources, applied in order (later sources override earlier ones):
//!  1. `config/docqueue.{yaml,toml,json}` - deployment-local defaults (optional)
//!  2. The file given with `--config` / `DOCQUEUE_CONFIG` (required when given)
//!  3. Environment variables prefixed `DOCQUEUE__` with `__` as separator,
//!     e.g. `DOCQUEUE__WATCHER__PAGE_SIZE=10` sets `watcher.page_size = 10`
//!
//! Every field carries a serde default, so an entirely unconfigured environment
//! still yields valid settings.

use docqueue_core::{ConfigurationError, WatcherConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors raised while resolving settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ConfigurationError),
}

/// Top-level CLI settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreSettings,
    pub watcher: WatcherSettings,
    pub consumers: ConsumerSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Reject settings the queue cannot run with
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.consumers.count == 0 {
            return Err(ConfigurationError::Invalid {
                field: "consumers.count".to_string(),
                message: "at least one consumer is required".to_string(),
            });
        }

        if self.store.kind == StoreKind::Filesystem && self.store.path.as_os_str().is_empty() {
            return Err(ConfigurationError::Missing {
                key: "store.path".to_string(),
            });
        }

        self.watcher.to_config().validate()
    }
}

/// Which document store backs the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Process-local; contents vanish on exit
    Memory,
    /// One JSON document per message under `store.path`
    Filesystem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub kind: StoreKind,
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            kind: StoreKind::Filesystem,
            path: PathBuf::from("data/docqueue"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherSettings {
    pub page_size: usize,
    pub poll_interval_ms: u64,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        let defaults = WatcherConfig::default();
        Self {
            page_size: defaults.page_size,
            poll_interval_ms: defaults.poll_interval.as_millis() as u64,
        }
    }
}

impl WatcherSettings {
    pub fn to_config(&self) -> WatcherConfig {
        WatcherConfig::new(self.page_size, Duration::from_millis(self.poll_interval_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerSettings {
    /// Number of consumers draining the watcher
    pub count: usize,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self { count: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Load settings from the standard sources and the process environment
pub fn load_settings(explicit_path: Option<&Path>) -> Result<Settings, SettingsError> {
    load_settings_from(explicit_path, None)
}

/// Load settings, optionally replacing the process environment with `env`
pub fn load_settings_from(
    explicit_path: Option<&Path>,
    env: Option<HashMap<String, String>>,
) -> Result<Settings, SettingsError> {
    let mut builder = config::Config::builder()
        .add_source(config::File::with_name("config/docqueue").required(false));

    if let Some(path) = explicit_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let settings: Settings = builder
        .add_source(
            config::Environment::with_prefix("DOCQUEUE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(env),
        )
        .build()?
        .try_deserialize()?;

    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
