// src/monitor/observer.rs

//! Synchronous per-root tick logic.
//!
//! A [`RootObserver`] owns the previous snapshot of one root. `check` takes
//! a new snapshot, diffs it, dispatches to listeners and stores the new
//! snapshot. It has no Tokio types and does no scheduling; the async loop in
//! [`crate::monitor::alteration`] decides *when* to call it.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::fs::FileSystem;
use crate::listener::AlterationListener;
use crate::monitor::diff::{diff, ChangeSet};
use crate::monitor::snapshot::{scan, ScanWarning, Snapshot};
use crate::types::{Epoch, ReloadEvent};

/// Source of epochs for one root. Every listener on that root sees the
/// same contiguous sequence.
#[derive(Debug, Default)]
pub struct EpochCounter {
    last: AtomicU64,
}

impl EpochCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the next epoch (the first call returns 1).
    pub fn next(&self) -> Epoch {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn last(&self) -> Epoch {
        self.last.load(Ordering::SeqCst)
    }
}

/// What one `check` observed.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    /// The event that was dispatched, if the change set was non-empty.
    pub event: Option<ReloadEvent>,
    pub warnings: Vec<ScanWarning>,
}

/// Scan/diff state for a single root.
#[derive(Debug)]
pub struct RootObserver {
    root: PathBuf,
    previous: Snapshot,
    checks: u64,
}

impl RootObserver {
    /// A fresh observer starts from an empty snapshot, so its first check
    /// reports every existing file as created.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            previous: Snapshot::default(),
            checks: 0,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn previous(&self) -> &Snapshot {
        &self.previous
    }

    pub fn checks(&self) -> u64 {
        self.checks
    }

    /// Run one tick for this root.
    ///
    /// Listeners are notified synchronously, in slice order: first
    /// `on_event` (only if something changed), then `on_check`. A panicking
    /// listener is logged and skipped; the others still get both calls and
    /// the new snapshot is kept.
    pub fn check(
        &mut self,
        fs: &dyn FileSystem,
        epochs: &EpochCounter,
        listeners: &[Arc<dyn AlterationListener>],
    ) -> CheckOutcome {
        let scan = scan(fs, &self.root);
        let changes = diff(&self.previous, &scan.snapshot);
        self.previous = scan.snapshot;
        self.checks += 1;

        let event = if changes.is_empty() {
            debug!(root = ?self.root, check = self.checks, "no changes");
            None
        } else {
            let event = ReloadEvent::new(self.root.clone(), epochs.next(), changes);
            info!(%event, "dispatching reload event");
            for (index, listener) in listeners.iter().enumerate() {
                self.notify(index, "on_event", || listener.on_event(&event));
            }
            Some(event)
        };

        for (index, listener) in listeners.iter().enumerate() {
            self.notify(index, "on_check", || listener.on_check());
        }

        CheckOutcome {
            event,
            warnings: scan.warnings,
        }
    }

    fn notify(&self, index: usize, callback: &'static str, call: impl FnOnce()) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(call)) {
            warn!(
                root = ?self.root,
                listener = index,
                callback,
                panic = panic_message(payload.as_ref()),
                "listener panicked"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

/// Convenience for callers that only want the change set of one check.
impl CheckOutcome {
    pub fn changes(&self) -> Option<&ChangeSet> {
        self.event.as_ref().map(|e| &e.changes)
    }
}
