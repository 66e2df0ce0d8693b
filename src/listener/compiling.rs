// src/listener/compiling.rs

//! Recompile-on-change.
//!
//! A [`CompilingListener`] watches a *source* root. On every event it hands
//! the created and modified sources to a [`Compiler`], removes artifacts of
//! deleted sources, and then forwards a derived event that describes the
//! *artifact* changes to its sinks. A module loader subscribed to it
//! therefore reloads exactly what the compiler rewrote.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::compiler::{CompilationResult, Compiler};
use crate::errors::WaitError;
use crate::listener::reloading::ReloadingListener;
use crate::listener::signals::CheckProgress;
use crate::listener::{AlterationListener, ReloadSink};
use crate::loader::naming;
use crate::monitor::ChangeSet;
use crate::store::{ResourceReader, ResourceStore};
use crate::types::ReloadEvent;

/// Wraps a store and remembers which names were written through it.
struct RecordingStore<'a> {
    inner: &'a dyn ResourceStore,
    created: Mutex<BTreeSet<String>>,
    modified: Mutex<BTreeSet<String>>,
}

impl<'a> RecordingStore<'a> {
    fn new(inner: &'a dyn ResourceStore) -> Self {
        Self {
            inner,
            created: Mutex::new(BTreeSet::new()),
            modified: Mutex::new(BTreeSet::new()),
        }
    }

    /// `(created, modified)`; a name written twice counts as created.
    fn into_sets(self) -> (BTreeSet<String>, BTreeSet<String>) {
        let created = self.created.into_inner().unwrap_or_else(PoisonError::into_inner);
        let mut modified = self.modified.into_inner().unwrap_or_else(PoisonError::into_inner);
        modified.retain(|name| !created.contains(name));
        (created, modified)
    }
}

impl ResourceStore for RecordingStore<'_> {
    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let existed = self.inner.contains(name);
        self.inner.write(name, bytes)?;
        let set = if existed { &self.modified } else { &self.created };
        set.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string());
        Ok(())
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        self.inner.read(name)
    }

    fn remove(&self, name: &str) -> Result<bool> {
        self.inner.remove(name)
    }

    fn contains(&self, name: &str) -> bool {
        self.inner.contains(name)
    }
}

/// Listener that compiles changed sources before notifying its sinks.
pub struct CompilingListener<C: Compiler> {
    compiler: C,
    sources: Arc<dyn ResourceReader>,
    store: Arc<dyn ResourceStore>,
    reloading: ReloadingListener,
    last_result: Mutex<Option<CompilationResult>>,
}

impl<C: Compiler> std::fmt::Debug for CompilingListener<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilingListener")
            .field("reloading", &self.reloading)
            .finish_non_exhaustive()
    }
}

impl<C: Compiler> CompilingListener<C> {
    /// `sources` must resolve the same relative paths the monitor reports
    /// for the watched root; artifacts go to `store`.
    pub fn new(compiler: C, sources: Arc<dyn ResourceReader>, store: Arc<dyn ResourceStore>) -> Self {
        Self {
            compiler,
            sources,
            store,
            reloading: ReloadingListener::new(),
            last_result: Mutex::new(None),
        }
    }

    pub fn add_sink(&self, sink: Arc<dyn ReloadSink>) {
        self.reloading.add_sink(sink);
    }

    pub fn remove_sink<S: ReloadSink + ?Sized>(&self, sink: &Arc<S>) -> bool {
        self.reloading.remove_sink(sink)
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    /// Result of the most recent compilation, if any ran.
    pub fn last_result(&self) -> Option<CompilationResult> {
        self.last_result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn progress(&self) -> CheckProgress {
        self.reloading.progress()
    }

    pub fn wait_for_first_check(
        &self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<(), WaitError>> + '_ {
        self.reloading.wait_for_first_check(timeout)
    }

    pub fn wait_for_check(
        &self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<(), WaitError>> + '_ {
        self.reloading.wait_for_check(timeout)
    }

    /// Resolves once a tick produced artifact changes and the sinks saw them.
    pub fn wait_for_event(
        &self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<(), WaitError>> + '_ {
        self.reloading.wait_for_event(timeout)
    }

    /// Compile, clean up, and work out which artifacts changed.
    fn rebuild(&self, event: &ReloadEvent) -> ChangeSet {
        let to_compile: Vec<String> = event
            .changes
            .created
            .iter()
            .chain(event.changes.modified.iter())
            .cloned()
            .collect();

        let mut artifacts = ChangeSet::default();

        if !to_compile.is_empty() {
            let recording = RecordingStore::new(self.store.as_ref());
            let result = self
                .compiler
                .compile(&to_compile, self.sources.as_ref(), &recording);

            for problem in &result.errors {
                warn!(%problem, "compilation error");
            }
            for problem in &result.warnings {
                debug!(%problem, "compilation warning");
            }
            info!(
                epoch = event.epoch,
                sources = to_compile.len(),
                errors = result.errors.len(),
                warnings = result.warnings.len(),
                "compiled changed sources"
            );

            let (created, modified) = recording.into_sets();
            artifacts.created = created;
            artifacts.modified = modified;
            *self.last_result.lock().unwrap_or_else(PoisonError::into_inner) = Some(result);
        }

        for source in &event.changes.deleted {
            let artifact = naming::artifact_for_source(source);
            match self.store.remove(&artifact) {
                Ok(true) => {
                    debug!(%source, %artifact, "removed artifact of deleted source");
                    artifacts.deleted.insert(artifact);
                }
                Ok(false) => {}
                Err(err) => warn!(%artifact, error = %err, "failed to remove artifact"),
            }
        }

        artifacts
    }
}

impl<C: Compiler> AlterationListener for CompilingListener<C> {
    fn on_event(&self, event: &ReloadEvent) {
        let artifacts = self.rebuild(event);
        if artifacts.is_empty() {
            debug!(epoch = event.epoch, "source change produced no artifact changes");
            return;
        }
        let derived = ReloadEvent::new(event.root.clone(), event.epoch, artifacts);
        self.reloading.forward(&derived);
    }

    fn on_check(&self) {
        self.reloading.on_check();
    }
}
