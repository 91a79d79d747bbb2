//! Host activity abstractions.
//!
//! A host is the application-lifecycle container: it knows whether the app is
//! in the background, owns the thread on which lifecycle callbacks run, and
//! notifies registered [`LifecycleListener`]s of foreground/background
//! transitions. [`EventLoopHost`] is the in-process implementation; the
//! Android bridge forwards activity callbacks into one.

use std::fmt;
use std::sync::Arc;

use crate::error::HostError;
use crate::telemetry::{self, TelemetryCollector};

mod event_loop;

pub use event_loop::{EventLoopHost, Transition};

/// One-shot unit of work executed on the host thread.
pub type HostTask = Box<dyn FnOnce() + Send + 'static>;

/// Registration token issued by [`HostActivity::register_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Callbacks delivered by the host on its own thread.
pub trait LifecycleListener: Send + Sync {
    /// The application came to the foreground.
    fn on_resume(&self);

    /// The application went to the background.
    fn on_pause(&self);
}

/// Capabilities a host exposes to lifecycle-bound components.
pub trait HostActivity: Send + Sync {
    /// Current background state.
    fn is_paused(&self) -> bool;

    /// Add a listener. Returns `None` when the host no longer accepts
    /// listeners (it is shutting down).
    fn register_listener(&self, listener: Arc<dyn LifecycleListener>) -> Option<ListenerId>;

    /// Remove a listener. Returns whether it was registered.
    fn unregister_listener(&self, id: ListenerId) -> bool;

    /// Queue `task` to run on the host thread, after everything queued before it.
    fn run_on_host_thread(&self, task: HostTask) -> Result<(), HostError>;

    /// Collector that components bound to this host should record into.
    fn telemetry(&self) -> Arc<TelemetryCollector> {
        telemetry::hub()
    }
}
