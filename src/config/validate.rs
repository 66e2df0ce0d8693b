// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ReloadwatchError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::ReloadwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.monitor))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_root(cfg)?;
    validate_interval(cfg)?;
    Ok(())
}

fn validate_root(cfg: &RawConfigFile) -> Result<()> {
    if cfg.monitor.root.as_os_str().is_empty() {
        return Err(ReloadwatchError::ConfigError(
            "[monitor].root must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_interval(cfg: &RawConfigFile) -> Result<()> {
    if cfg.monitor.interval_ms == 0 {
        return Err(ReloadwatchError::ConfigError(
            "[monitor].interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}
