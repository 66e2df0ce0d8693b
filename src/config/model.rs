// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::monitor::{MonitorConfig, DEFAULT_INTERVAL};

/// Raw configuration as read from a TOML file, before validation.
///
/// ```toml
/// [monitor]
/// root = "modules"
/// interval_ms = 500
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub monitor: MonitorSection,
}

/// `[monitor]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitorSection {
    /// Directory to watch. Relative paths are resolved against the
    /// directory containing the config file.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Poll interval in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL.as_millis() as u64
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            interval_ms: default_interval_ms(),
        }
    }
}

/// Validated configuration. Only constructible through `TryFrom`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub monitor: MonitorSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(monitor: MonitorSection) -> Self {
        Self { monitor }
    }

    pub fn root(&self) -> &PathBuf {
        &self.monitor.root
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.monitor.interval_ms)
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig::with_interval(self.interval())
    }
}
