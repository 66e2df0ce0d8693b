// src/errors.rs

//! Crate-wide error types.
//!
//! Every failure in the reload core is a value handed back to the caller:
//! - [`LoadError`] from `ModuleLoader::load`
//! - [`WaitError`] from the `wait_for_*` synchronization points
//! - [`MonitorError`] from `AlterationMonitor::start`
//!
//! Per-entry scan failures are not errors at all; they are collected as
//! [`crate::monitor::ScanWarning`]s and the scan carries on.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReloadwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure to resolve a module through a [`crate::loader::ModuleLoader`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// No resource backs this module (never existed, or was deleted).
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// `name` references `missing`, which currently cannot be resolved.
    #[error("module '{name}' is missing dependency '{missing}'")]
    MissingDependency { name: String, missing: String },

    /// The store failed for a reason other than absence.
    #[error("failed to read resource for '{name}': {reason}")]
    Store { name: String, reason: String },
}

impl LoadError {
    /// The name that could not be found, for either not-found flavour.
    pub fn missing_name(&self) -> Option<&str> {
        match self {
            LoadError::ResourceNotFound(name) => Some(name),
            LoadError::MissingDependency { missing, .. } => Some(missing),
            LoadError::Store { .. } => None,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    #[error("timed out after {0:?} waiting for the monitor")]
    Timeout(Duration),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorError {
    #[error("monitor is already running")]
    AlreadyRunning,

    #[error("monitor must be started from within a tokio runtime")]
    NoRuntime,
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ReloadwatchError>;
