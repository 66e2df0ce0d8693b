// src/monitor/snapshot.rs

//! Directory tree snapshots.
//!
//! [`scan`] walks a root through the [`FileSystem`] abstraction and records
//! size + mtime for every regular file. Failures on individual entries
//! (permissions, dangling links, symlink cycles) become [`ScanWarning`]s; they
//! never abort the walk.

use std::collections::btree_map;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::monitor::path_utils::relative_str;

/// One regular file as observed by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the scan root, `/`-separated.
    pub path: String,
    pub size: u64,
    pub modified: SystemTime,
}

impl FileEntry {
    /// Two observations of the same path are unchanged iff size and mtime
    /// both match.
    pub fn is_unchanged(&self, other: &FileEntry) -> bool {
        self.size == other.size && self.modified == other.modified
    }
}

/// Immutable view of a tree at one scan instant, keyed by relative path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<String, FileEntry>,
}

impl Snapshot {
    pub fn from_entries(entries: impl IntoIterator<Item = FileEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.path.clone(), e)).collect(),
        }
    }

    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> btree_map::Values<'_, String, FileEntry> {
        self.entries.values()
    }
}

/// A recoverable problem with a single entry during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanWarning {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of one walk: the snapshot plus anything that had to be skipped.
#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub snapshot: Snapshot,
    pub warnings: Vec<ScanWarning>,
}

impl Scan {
    fn skip(&mut self, path: &Path, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(path = ?path, %reason, "skipping entry during scan");
        self.warnings.push(ScanWarning {
            path: path.to_path_buf(),
            reason,
        });
    }
}

/// Walk `root` and record every regular file below it.
///
/// Symlinked directories are followed, but each canonical directory is
/// entered at most once per scan, which also breaks symlink cycles. Children
/// are visited in sorted order and symlinked directories only after every
/// plain directory, so when two paths reach the same directory the plain one
/// keeps its files, and the choice is the same on every scan.
pub fn scan(fs: &dyn FileSystem, root: &Path) -> Scan {
    let mut scan = Scan::default();
    let mut entries = Vec::new();

    match fs.metadata(root) {
        Ok(meta) if meta.is_dir => {}
        Ok(_) => {
            scan.skip(root, "scan root is not a directory");
            return scan;
        }
        Err(err) => {
            scan.skip(root, format!("scan root unavailable: {err:#}"));
            return scan;
        }
    }

    let mut visited: HashSet<PathBuf> = HashSet::new();
    let mut stack: Vec<PathBuf> = vec![root.to_path_buf()];
    let mut linked: Vec<PathBuf> = Vec::new();

    while let Some(dir) = stack.pop().or_else(|| linked.pop()) {
        let canonical = fs.canonicalize(&dir).unwrap_or_else(|_| dir.clone());
        if !visited.insert(canonical) {
            scan.skip(&dir, "directory already visited through another path");
            continue;
        }

        let mut children = match fs.read_dir(&dir) {
            Ok(children) => children,
            Err(err) => {
                scan.skip(&dir, format!("{err:#}"));
                continue;
            }
        };
        // Reversed so the stack pops them in ascending order.
        children.sort_unstable_by(|a, b| b.cmp(a));

        for child in children {
            let meta = match fs.metadata(&child) {
                Ok(meta) => meta,
                Err(err) => {
                    scan.skip(&child, format!("{err:#}"));
                    continue;
                }
            };

            if meta.is_dir {
                if meta.is_symlink {
                    linked.push(child);
                } else {
                    stack.push(child);
                }
                continue;
            }

            match relative_str(fs, root, &child) {
                Some(path) => entries.push(FileEntry {
                    path,
                    size: meta.len,
                    modified: meta.modified,
                }),
                None => scan.skip(&child, "entry is not below the scan root"),
            }
        }
    }

    scan.snapshot = Snapshot::from_entries(entries);
    debug!(
        root = ?root,
        files = scan.snapshot.len(),
        warnings = scan.warnings.len(),
        "scan complete"
    );
    scan
}
