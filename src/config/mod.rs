// src/config/mod.rs

//! Configuration for the `reloadwatch` binary.
//!
//! The library itself is configured in code (`MonitorConfig`, listener
//! roots, `ModuleLoader::with_parent`); this module only maps a TOML file
//! onto those knobs.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_resolved};
pub use model::{ConfigFile, MonitorSection, RawConfigFile};
