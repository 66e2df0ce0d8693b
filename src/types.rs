use std::fmt;
use std::path::PathBuf;

use crate::monitor::ChangeSet;

/// Monotonically increasing dispatch counter assigned by the monitor.
///
/// Epoch `0` is reserved for "before any event was delivered".
pub type Epoch = u64;

/// A delivered change: one root's [`ChangeSet`] stamped with its epoch.
///
/// Paths inside `changes` are relative to `root` and use `/` separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadEvent {
    pub root: PathBuf,
    pub epoch: Epoch,
    pub changes: ChangeSet,
}

impl ReloadEvent {
    pub fn new(root: impl Into<PathBuf>, epoch: Epoch, changes: ChangeSet) -> Self {
        Self {
            root: root.into(),
            epoch,
            changes,
        }
    }
}

impl fmt::Display for ReloadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "epoch {} on {:?}: {} created, {} modified, {} deleted",
            self.epoch,
            self.root,
            self.changes.created.len(),
            self.changes.modified.len(),
            self.changes.deleted.len()
        )
    }
}
