use std::sync::{Arc, Mutex};
use std::time::Duration;

use reloadwatch::listener::{AlterationListener, ReloadSink};
use reloadwatch::types::ReloadEvent;
use tokio::sync::Notify;

/// Listener that keeps every event it is handed.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ReloadEvent>>,
    checks: Mutex<u64>,
    notify: Notify,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ReloadEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn epochs(&self) -> Vec<u64> {
        self.events().iter().map(|e| e.epoch).collect()
    }

    pub fn checks(&self) -> u64 {
        *self.checks.lock().unwrap()
    }

    /// Wait until at least `n` checks have been observed.
    pub async fn wait_for_checks(&self, n: u64, limit: Duration) -> bool {
        tokio::time::timeout(limit, async {
            loop {
                let notified = self.notify.notified();
                if self.checks() >= n {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

impl AlterationListener for RecordingListener {
    fn on_event(&self, event: &ReloadEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn on_check(&self) {
        *self.checks.lock().unwrap() += 1;
        self.notify.notify_waiters();
    }
}

/// Sink that keeps every forwarded event.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ReloadEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ReloadEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ReloadSink for RecordingSink {
    fn on_reload(&self, event: &ReloadEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
