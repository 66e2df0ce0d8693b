// src/listener/mod.rs

//! Listener side of the notification protocol.
//!
//! - [`AlterationListener`] is what the monitor calls on every tick.
//! - [`signals`] holds the three synchronization points
//!   (`first check`, `check`, `event`) callers can await.
//! - [`reloading`] forwards events to [`ReloadSink`]s (e.g. the module
//!   loader) before releasing any waiter.
//! - [`compiling`] runs a compiler backend over changed sources and forwards
//!   the resulting output changes instead.

pub mod compiling;
pub mod reloading;
pub mod signals;

use crate::types::ReloadEvent;

/// Callback interface driven by [`crate::monitor::AlterationMonitor`].
///
/// Both methods run on the monitor's scan thread, in registration order, and
/// the tick does not advance until every listener has returned.
pub trait AlterationListener: Send + Sync {
    /// A scan of this listener's root produced a non-empty change set.
    fn on_event(&self, event: &ReloadEvent);

    /// A scan of this listener's root finished, after any `on_event` for the
    /// same tick.
    fn on_check(&self) {}
}

/// Receiver of reload notifications, typically a module loader.
pub trait ReloadSink: Send + Sync {
    fn on_reload(&self, event: &ReloadEvent);
}

pub use compiling::CompilingListener;
pub use reloading::ReloadingListener;
pub use signals::{CheckProgress, CheckSignals};
