// src/listener/signals.rs

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use crate::errors::WaitError;

/// Counters published after every completed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckProgress {
    /// Completed scans of the listener's root.
    pub checks: u64,
    /// Completed scans that delivered a non-empty change set.
    pub events: u64,
}

/// The three synchronization points of a listener.
///
/// Backed by a single `watch` channel: waiters remember the counter they
/// started from, subscribe, and sleep until the monitor bumps it. Nothing
/// polls.
///
/// The starting counter is read when a `wait_for_*` method is *called*, not
/// when the returned future is first polled.
#[derive(Debug)]
pub struct CheckSignals {
    progress: watch::Sender<CheckProgress>,
}

impl Default for CheckSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckSignals {
    pub fn new() -> Self {
        let (progress, _rx) = watch::channel(CheckProgress::default());
        Self { progress }
    }

    /// Publish the completion of one tick.
    pub fn record_check(&self, delivered_event: bool) {
        self.progress.send_modify(|p| {
            p.checks += 1;
            if delivered_event {
                p.events += 1;
            }
        });
    }

    pub fn progress(&self) -> CheckProgress {
        *self.progress.borrow()
    }

    /// Resolve once the very first scan has completed.
    pub fn wait_for_first_check(
        &self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<(), WaitError>> + '_ {
        self.wait_until(timeout, |p| p.checks >= 1)
    }

    /// Resolve once the next scan after this call has completed, whether or
    /// not it saw any change.
    pub fn wait_for_check(
        &self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<(), WaitError>> + '_ {
        let start = self.progress().checks;
        self.wait_until(timeout, move |p| p.checks > start)
    }

    /// Resolve once a scan after this call has delivered a non-empty change
    /// set.
    pub fn wait_for_event(
        &self,
        timeout: Option<Duration>,
    ) -> impl Future<Output = Result<(), WaitError>> + '_ {
        let start = self.progress().events;
        self.wait_until(timeout, move |p| p.events > start)
    }

    async fn wait_until<F>(&self, timeout: Option<Duration>, ready: F) -> Result<(), WaitError>
    where
        F: FnMut(&CheckProgress) -> bool,
    {
        let mut rx = self.progress.subscribe();
        let wait = async move {
            // The sender lives in `self`, so the channel cannot close while
            // we are borrowed.
            let _ = rx.wait_for(ready).await.map(|_| ());
        };

        match timeout {
            None => {
                wait.await;
                Ok(())
            }
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(()) => Ok(()),
                Err(_) => {
                    debug!(?limit, "listener wait timed out");
                    Err(WaitError::Timeout(limit))
                }
            },
        }
    }
}
