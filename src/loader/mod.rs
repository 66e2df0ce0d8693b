// src/loader/mod.rs

//! Dependency-aware module loading.
//!
//! - [`naming`] maps module names to resource names.
//! - [`linker`] discovers which modules an artifact references.
//! - [`graph`] keeps the reverse dependency edges.
//! - [`cache`] holds loaded modules and performs cascading invalidation.
//!
//! [`ModuleLoader`] ties them together. Resolution is self-first: the
//! loader's own store is consulted before the parent, so a reloaded module
//! can shadow a definition the parent already provides.

pub mod cache;
pub mod graph;
pub mod linker;
pub mod naming;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::errors::LoadError;
use crate::listener::ReloadSink;
use crate::store::ResourceStore;
use crate::types::{Epoch, ReloadEvent};

pub use cache::ModuleCache;
pub use graph::DependencyGraph;
pub use linker::{ImportLinker, Linker, NoLinks};

/// A loaded module. Records are replaced on reload, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Number of reload events the loader had accepted when this record was
    /// defined (0 if none). With a single root this is that root's epoch.
    pub resolved_at: Epoch,
    /// Modules referenced while this one was being defined.
    pub dependencies: BTreeSet<String>,
}

/// Anything that can resolve a module by name. Used for parent chains.
pub trait ModuleResolver: Send + Sync {
    fn load(&self, name: &str) -> Result<Arc<Module>, LoadError>;
}

/// Caching loader over a [`ResourceStore`] that invalidates itself on
/// [`ReloadEvent`]s.
pub struct ModuleLoader {
    store: Arc<dyn ResourceStore>,
    linker: Arc<dyn Linker>,
    parent: Option<Arc<dyn ModuleResolver>>,
    cache: Mutex<ModuleCache>,
}

impl std::fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("cached", &self.lock().len())
            .field("has_parent", &self.parent.is_some())
            .finish_non_exhaustive()
    }
}

impl ModuleLoader {
    /// Loader over `store` using [`ImportLinker`] and no parent.
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self {
            store,
            linker: Arc::new(ImportLinker),
            parent: None,
            cache: Mutex::new(ModuleCache::new()),
        }
    }

    pub fn with_linker(mut self, linker: Arc<dyn Linker>) -> Self {
        self.linker = linker;
        self
    }

    /// Fall back to `parent` for names this loader's store does not have.
    pub fn with_parent(mut self, parent: Arc<dyn ModuleResolver>) -> Self {
        self.parent = Some(parent);
        self
    }

    fn lock(&self) -> MutexGuard<'_, ModuleCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.lock().contains(name)
    }

    pub fn cached_names(&self) -> BTreeSet<String> {
        self.lock().names()
    }

    /// Epoch of the last reload event accepted from `root` (0 if none).
    pub fn last_epoch(&self, root: &Path) -> Epoch {
        self.lock().last_epoch(root)
    }

    /// Reload events accepted so far, across all roots.
    pub fn applied_events(&self) -> u64 {
        self.lock().applied()
    }

    /// Resolve `name` to a module.
    ///
    /// - A cached record is returned while its resource still exists.
    /// - Otherwise the resource is read and linked; every referenced module
    ///   is resolved first and becomes a dependency.
    /// - A missing resource falls back to the parent, if any.
    /// - A reference that cannot be resolved fails with
    ///   [`LoadError::MissingDependency`] naming the innermost missing module.
    pub fn load(&self, name: &str) -> Result<Arc<Module>, LoadError> {
        let mut chain = Vec::new();
        self.load_in_chain(name, &mut chain)
    }

    /// `chain` holds the modules currently being defined by this call, outermost
    /// first.
    fn load_in_chain(&self, name: &str, chain: &mut Vec<String>) -> Result<Arc<Module>, LoadError> {
        let resource = naming::resource_name(name);

        let generation = {
            let cache = self.lock();
            if cache.is_tombstoned(name) {
                debug!(module = %name, "module was deleted; refusing to load");
                return Err(LoadError::ResourceNotFound(name.to_string()));
            }
            if let Some(module) = cache.get(name) {
                if self.store.contains(&resource) {
                    return Ok(Arc::clone(module));
                }
                debug!(module = %name, "cached module lost its resource");
            }
            cache.generation()
        };

        let bytes = match self.store.read(&resource) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return self.delegate(name),
            Err(err) => {
                warn!(module = %name, error = %err, "resource store read failed");
                return Err(LoadError::Store {
                    name: name.to_string(),
                    reason: format!("{err:#}"),
                });
            }
        };

        chain.push(name.to_string());
        let linked = self.link(name, &bytes, chain);
        chain.pop();
        let dependencies = linked?;

        let mut cache = self.lock();
        let module = Arc::new(Module {
            name: name.to_string(),
            bytes,
            resolved_at: cache.applied(),
            dependencies,
        });

        if cache.generation() == generation {
            cache.insert(Arc::clone(&module));
            debug!(module = %name, deps = ?module.dependencies, "module defined");
        } else {
            // An invalidation ran while we were reading; this result may
            // already be stale for later callers.
            debug!(module = %name, "cache changed during load; not caching");
        }
        Ok(module)
    }

    fn link(&self, name: &str, bytes: &[u8], chain: &mut Vec<String>) -> Result<BTreeSet<String>, LoadError> {
        let mut dependencies = BTreeSet::new();

        for reference in self.linker.references(name, bytes) {
            if reference == name {
                continue;
            }
            dependencies.insert(reference.clone());

            // Mutual reference: the target is being defined further up this
            // chain, so only the edge is recorded.
            if chain.contains(&reference) {
                continue;
            }

            match self.load_in_chain(&reference, chain) {
                Ok(_) => {}
                Err(LoadError::ResourceNotFound(missing))
                | Err(LoadError::MissingDependency { missing, .. }) => {
                    return Err(LoadError::MissingDependency {
                        name: name.to_string(),
                        missing,
                    });
                }
                Err(other) => return Err(other),
            }
        }

        Ok(dependencies)
    }

    fn delegate(&self, name: &str) -> Result<Arc<Module>, LoadError> {
        match &self.parent {
            Some(parent) => {
                debug!(module = %name, "not owned locally; asking parent");
                parent.load(name)
            }
            None => Err(LoadError::ResourceNotFound(name.to_string())),
        }
    }

    /// Apply a reload event to the cache.
    ///
    /// Every created, modified or deleted module is evicted together with
    /// everything that transitively depends on it. Deleted modules are
    /// tombstoned until a later event recreates them.
    pub fn apply(&self, event: &ReloadEvent) {
        let mut cache = self.lock();

        if !cache.advance_epoch(&event.root, event.epoch) {
            warn!(
                root = ?event.root,
                epoch = event.epoch,
                last = cache.last_epoch(&event.root),
                "ignoring stale reload event"
            );
            return;
        }

        let mut roots: Vec<String> = Vec::new();
        for path in event.changes.created.iter().chain(event.changes.modified.iter()) {
            if let Some(module) = naming::module_name(path) {
                cache.revive(&module);
                roots.push(module);
            }
        }
        for path in &event.changes.deleted {
            if let Some(module) = naming::module_name(path) {
                cache.tombstone(&module);
                roots.push(module);
            }
        }

        let evicted = cache.invalidate(roots.iter().map(|s| s.as_str()));
        info!(epoch = event.epoch, ?evicted, "applied reload event");
    }
}

impl ModuleResolver for ModuleLoader {
    fn load(&self, name: &str) -> Result<Arc<Module>, LoadError> {
        ModuleLoader::load(self, name)
    }
}

impl ReloadSink for ModuleLoader {
    fn on_reload(&self, event: &ReloadEvent) {
        self.apply(event);
    }
}
