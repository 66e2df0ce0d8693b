// src/loader/cache.rs

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::loader::graph::DependencyGraph;
use crate::loader::Module;
use crate::types::Epoch;

/// Loaded modules plus everything needed to invalidate them.
///
/// Always accessed under the loader's single mutex, so an invalidation walk
/// never observes a half-updated graph.
#[derive(Debug, Default)]
pub struct ModuleCache {
    modules: HashMap<String, Arc<Module>>,
    graph: DependencyGraph,
    /// Deleted modules that must not load until they are recreated.
    tombstones: HashSet<String>,
    /// Bumped on every invalidation; loads that started under an older
    /// generation do not get cached.
    generation: u64,
    /// Last accepted epoch per monitored root. Epochs are only ordered
    /// within one root.
    epochs: HashMap<PathBuf, Epoch>,
    /// Reload events accepted so far, across all roots.
    applied: u64,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Module>> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.modules.keys().cloned().collect()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Last accepted epoch for `root` (0 if none).
    pub fn last_epoch(&self, root: &Path) -> Epoch {
        self.epochs.get(root).copied().unwrap_or(0)
    }

    pub fn applied(&self) -> u64 {
        self.applied
    }

    pub fn is_tombstoned(&self, name: &str) -> bool {
        self.tombstones.contains(name)
    }

    /// Record a freshly defined module, replacing any previous record.
    pub fn insert(&mut self, module: Arc<Module>) {
        self.graph
            .set_dependencies(&module.name, module.dependencies.iter());
        self.modules.insert(module.name.clone(), module);
    }

    /// Move `root` to `epoch` if it is newer than the last one accepted for
    /// that root.
    ///
    /// Returns `false` for stale or duplicate epochs, which must be ignored.
    pub fn advance_epoch(&mut self, root: &Path, epoch: Epoch) -> bool {
        let last = self.epochs.entry(root.to_path_buf()).or_insert(0);
        if epoch <= *last {
            return false;
        }
        *last = epoch;
        self.applied += 1;
        true
    }

    pub fn tombstone(&mut self, name: &str) {
        self.tombstones.insert(name.to_string());
    }

    pub fn revive(&mut self, name: &str) {
        self.tombstones.remove(name);
    }

    /// Evict `roots` and, transitively, every module that depends on any of
    /// them. Returns the names actually evicted.
    pub fn invalidate<'a>(&mut self, roots: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
        self.generation += 1;

        let affected = self.graph.closure(roots);
        let mut evicted = BTreeSet::new();
        for name in affected {
            self.graph.remove_dependencies(&name);
            if self.modules.remove(&name).is_some() {
                evicted.insert(name);
            }
        }

        debug!(generation = self.generation, ?evicted, "cache invalidated");
        evicted
    }
}
