// src/monitor/mod.rs

//! Polling change detection.
//!
//! This module is responsible for:
//! - Taking snapshots of a directory tree ([`snapshot`]).
//! - Diffing two snapshots into a [`ChangeSet`] ([`diff`]).
//! - Running the per-root tick: scan, diff, dispatch ([`observer`]).
//! - Owning the background loop that ticks on an interval ([`alteration`]).
//!
//! It does **not** know about modules or caches; it only turns tree state
//! into [`crate::types::ReloadEvent`]s for listeners.

pub mod alteration;
pub mod diff;
pub mod observer;
pub mod path_utils;
pub mod snapshot;

pub use alteration::{AlterationMonitor, MonitorConfig, DEFAULT_INTERVAL};
pub use diff::{diff, ChangeSet};
pub use observer::{CheckOutcome, EpochCounter, RootObserver};
pub use snapshot::{scan, FileEntry, Scan, ScanWarning, Snapshot};
