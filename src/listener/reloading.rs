// src/listener/reloading.rs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::errors::WaitError;
use crate::listener::signals::{CheckProgress, CheckSignals};
use crate::listener::{AlterationListener, ReloadSink};
use crate::types::ReloadEvent;

/// Listener that hands every event to its sinks and exposes the wait points.
///
/// Sinks are notified before the tick's signals fire, so once
/// [`ReloadingListener::wait_for_event`] returns, every sink has already
/// processed the triggering event.
#[derive(Default)]
pub struct ReloadingListener {
    signals: CheckSignals,
    sinks: RwLock<Vec<Arc<dyn ReloadSink>>>,
    /// Set by `on_event`, consumed by the `on_check` of the same tick.
    event_in_tick: AtomicBool,
}

impl std::fmt::Debug for ReloadingListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadingListener")
            .field("progress", &self.signals.progress())
            .finish_non_exhaustive()
    }
}

impl ReloadingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&self, sink: Arc<dyn ReloadSink>) {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sink);
    }

    /// Remove a sink by identity. Returns `true` if it was registered.
    pub fn remove_sink<S: ReloadSink + ?Sized>(&self, sink: &Arc<S>) -> bool {
        let mut sinks = self.sinks.write().unwrap_or_else(PoisonError::into_inner);
        let before = sinks.len();
        sinks.retain(|s| !std::ptr::addr_eq(Arc::as_ptr(s), Arc::as_ptr(sink)));
        sinks.len() != before
    }

    pub fn signals(&self) -> &CheckSignals {
        &self.signals
    }

    pub fn progress(&self) -> CheckProgress {
        self.signals.progress()
    }

    pub fn wait_for_first_check(
        &self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<(), WaitError>> + '_ {
        self.signals.wait_for_first_check(timeout)
    }

    pub fn wait_for_check(
        &self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<(), WaitError>> + '_ {
        self.signals.wait_for_check(timeout)
    }

    pub fn wait_for_event(
        &self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<(), WaitError>> + '_ {
        self.signals.wait_for_event(timeout)
    }

    /// Deliver `event` to the sinks and mark the current tick as eventful.
    ///
    /// Exposed for listeners that derive their own events (see
    /// [`crate::listener::CompilingListener`]).
    pub fn forward(&self, event: &ReloadEvent) {
        let sinks: Vec<Arc<dyn ReloadSink>> = self
            .sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        debug!(epoch = event.epoch, sinks = sinks.len(), "forwarding reload event");
        for sink in sinks {
            sink.on_reload(event);
        }
        self.event_in_tick.store(true, Ordering::SeqCst);
    }
}

impl AlterationListener for ReloadingListener {
    fn on_event(&self, event: &ReloadEvent) {
        self.forward(event);
    }

    fn on_check(&self) {
        let delivered = self.event_in_tick.swap(false, Ordering::SeqCst);
        self.signals.record_check(delivered);
    }
}
