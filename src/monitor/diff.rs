// src/monitor/diff.rs

use std::collections::BTreeSet;

use crate::monitor::snapshot::Snapshot;

/// Paths that appeared, changed or disappeared between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub created: BTreeSet<String>,
    pub modified: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.created.len() + self.modified.len() + self.deleted.len()
    }

    /// Every path mentioned in this change set.
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.created
            .iter()
            .chain(self.modified.iter())
            .chain(self.deleted.iter())
            .map(|s| s.as_str())
    }
}

/// Compare two snapshots of the same root.
///
/// A path present in both is `modified` when its size or mtime differs.
pub fn diff(previous: &Snapshot, next: &Snapshot) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for entry in next.iter() {
        match previous.get(&entry.path) {
            None => {
                changes.created.insert(entry.path.clone());
            }
            Some(old) if !old.is_unchanged(entry) => {
                changes.modified.insert(entry.path.clone());
            }
            Some(_) => {}
        }
    }

    for path in previous.paths() {
        if !next.contains(path) {
            changes.deleted.insert(path.to_string());
        }
    }

    changes
}
