// src/monitor/alteration.rs

use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::errors::MonitorError;
use crate::fs::{FileSystem, RealFileSystem};
use crate::listener::AlterationListener;
use crate::monitor::observer::{EpochCounter, RootObserver};
use crate::types::Epoch;

/// Poll interval used when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

thread_local! {
    /// True while this thread is inside a listener dispatch.
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

/// Resets [`DISPATCHING`] even if a listener panics.
struct DispatchGuard;

impl DispatchGuard {
    fn enter() -> Self {
        DISPATCHING.with(|d| d.set(true));
        DispatchGuard
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        DISPATCHING.with(|d| d.set(false));
    }
}

/// Clears the running flag when the loop task ends, however it ends.
struct RunningGuard(watch::Sender<bool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Time between the start of two consecutive ticks.
    pub interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl MonitorConfig {
    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }
}

struct RootRegistration {
    root: PathBuf,
    listeners: Vec<Arc<dyn AlterationListener>>,
}

/// State shared between the public handle and the loop task.
struct MonitorShared {
    fs: Arc<dyn FileSystem>,
    /// Registration order is preserved, both across roots and per root.
    registry: Mutex<Vec<RootRegistration>>,
    /// Previous snapshots. Only the loop task writes here.
    observers: Mutex<HashMap<PathBuf, RootObserver>>,
    /// One counter per root, kept for the monitor's lifetime so a root that
    /// is dropped and registered again continues its sequence.
    epochs: Mutex<HashMap<PathBuf, Arc<EpochCounter>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MonitorShared {
    /// Consistent copy of the registrations for one tick.
    fn registrations(&self) -> Vec<(PathBuf, Vec<Arc<dyn AlterationListener>>)> {
        lock(&self.registry)
            .iter()
            .map(|r| (r.root.clone(), r.listeners.clone()))
            .collect()
    }

    fn epochs_for(&self, root: &Path) -> Arc<EpochCounter> {
        Arc::clone(lock(&self.epochs).entry(root.to_path_buf()).or_default())
    }

    async fn tick(self: &Arc<Self>) {
        let registrations = self.registrations();

        // Roots without listeners lose their history.
        lock(&self.observers).retain(|root, _| registrations.iter().any(|(r, _)| r == root));

        for (root, listeners) in registrations {
            let observer = lock(&self.observers)
                .remove(&root)
                .unwrap_or_else(|| RootObserver::new(root.clone()));

            let epochs = self.epochs_for(&root);
            let fs = Arc::clone(&self.fs);
            let result = tokio::task::spawn_blocking(move || {
                let mut observer = observer;
                let _dispatching = DispatchGuard::enter();
                let outcome = observer.check(fs.as_ref(), &epochs, &listeners);
                (observer, outcome)
            })
            .await;

            match result {
                Ok((observer, outcome)) => {
                    if !outcome.warnings.is_empty() {
                        debug!(root = ?root, warnings = outcome.warnings.len(), "scan had skipped entries");
                    }
                    lock(&self.observers).insert(root, observer);
                }
                Err(err) => {
                    // Listener panics are caught inside `check`, so only the
                    // scan itself can land here. The next tick rescans from
                    // empty under the same epoch counter.
                    warn!(root = ?root, error = %err, "scan task failed");
                }
            }
        }
    }
}

/// Polls registered roots on a fixed interval and drives their listeners.
///
/// Lifecycle is `STOPPED -> RUNNING -> STOPPED`; a stopped monitor can be
/// started again and keeps its snapshots and epoch counters.
pub struct AlterationMonitor {
    shared: Arc<MonitorShared>,
    config: MonitorConfig,
    stop_tx: watch::Sender<bool>,
    running: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for AlterationMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlterationMonitor")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Default for AlterationMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

impl AlterationMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self::with_filesystem(config, Arc::new(RealFileSystem))
    }

    pub fn with_filesystem(config: MonitorConfig, fs: Arc<dyn FileSystem>) -> Self {
        let (stop_tx, _) = watch::channel(false);
        let (running, _) = watch::channel(false);
        Self {
            shared: Arc::new(MonitorShared {
                fs,
                registry: Mutex::new(Vec::new()),
                observers: Mutex::new(HashMap::new()),
                epochs: Mutex::new(HashMap::new()),
            }),
            config,
            stop_tx,
            running,
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> MonitorConfig {
        self.config
    }

    /// Epoch of the most recently dispatched event for `root` (0 if none
    /// yet). `root` is canonicalized the same way `add_listener` does it.
    pub fn last_epoch(&self, root: impl AsRef<Path>) -> Epoch {
        let root = root.as_ref();
        let root = self.shared.fs.canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        lock(&self.shared.epochs)
            .get(&root)
            .map_or(0, |epochs| epochs.last())
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    /// Registered roots, in registration order.
    pub fn roots(&self) -> Vec<PathBuf> {
        lock(&self.shared.registry)
            .iter()
            .map(|r| r.root.clone())
            .collect()
    }

    /// Register `listener` for changes below `root`.
    ///
    /// Safe while running; the listener takes part from the next tick on.
    pub fn add_listener(&self, root: impl Into<PathBuf>, listener: Arc<dyn AlterationListener>) {
        let root = root.into();
        let root = self.shared.fs.canonicalize(&root).unwrap_or(root);

        let mut registry = lock(&self.shared.registry);
        match registry.iter_mut().find(|r| r.root == root) {
            Some(reg) => reg.listeners.push(listener),
            None => registry.push(RootRegistration {
                root: root.clone(),
                listeners: vec![listener],
            }),
        }
        info!(root = ?root, "listener registered");
    }

    /// Unregister `listener` from every root. Returns `true` if it was found.
    pub fn remove_listener<L: AlterationListener + ?Sized>(&self, listener: &Arc<L>) -> bool {
        let mut registry = lock(&self.shared.registry);
        let mut removed = false;
        for reg in registry.iter_mut() {
            let before = reg.listeners.len();
            reg.listeners
                .retain(|l| !std::ptr::addr_eq(Arc::as_ptr(l), Arc::as_ptr(listener)));
            removed |= reg.listeners.len() != before;
        }
        registry.retain(|r| !r.listeners.is_empty());
        if removed {
            info!("listener removed");
        }
        removed
    }

    /// Spawn the scanning loop on the current Tokio runtime.
    ///
    /// The first tick runs immediately.
    pub fn start(&self) -> Result<(), MonitorError> {
        let mut task = lock(&self.task);
        if self.is_running() {
            return Err(MonitorError::AlreadyRunning);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| MonitorError::NoRuntime)?;

        self.stop_tx.send_replace(false);
        self.running.send_replace(true);

        let stop_rx = self.stop_tx.subscribe();
        let running = RunningGuard(self.running.clone());
        let shared = Arc::clone(&self.shared);
        let interval = self.config.interval;

        *task = Some(runtime.spawn(async move {
            let _running = running;
            run_loop(shared, interval, stop_rx).await;
        }));

        info!(interval = ?interval, "alteration monitor started");
        Ok(())
    }

    /// Ask the loop to exit after its current tick, without waiting.
    ///
    /// This is the variant to use from inside a listener callback.
    pub fn request_stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Stop the loop and wait until it has fully terminated.
    ///
    /// An in-flight tick always completes first. Once this returns, no
    /// further scans or listener calls happen. Called from inside a listener
    /// dispatch (or from the loop task itself) it only signals, since
    /// waiting there would wait on itself.
    pub async fn stop(&self) {
        self.request_stop();

        if DISPATCHING.with(Cell::get) {
            debug!("stop requested during dispatch; loop exits after this tick");
            return;
        }
        {
            let task = lock(&self.task);
            if let (Some(handle), Some(current)) = (task.as_ref(), tokio::task::try_id()) {
                if handle.id() == current {
                    return;
                }
            }
        }

        let mut running = self.running.subscribe();
        let _ = running.wait_for(|r| !*r).await.map(|_| ());

        if let Some(handle) = lock(&self.task).take() {
            drop(handle);
            info!("alteration monitor stopped");
        }
    }
}

impl Drop for AlterationMonitor {
    fn drop(&mut self) {
        self.request_stop();
    }
}

async fn run_loop(shared: Arc<MonitorShared>, interval: Duration, mut stop_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        if *stop_rx.borrow() {
            break;
        }
        shared.tick().await;
    }

    debug!("monitor loop finished");
}
