//! Lifecycle event types recorded by the host, the guard and the JNI layer.

use serde::{Deserialize, Serialize};

/// Device operation that produced a failure event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceOperation {
    Create,
    Start,
    Stop,
}

/// Lifecycle events covering library load, host transitions, listener
/// registration and device state changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum LifecycleEvent {
    NativeLibraryLoaded,
    AndroidContextInitialized,
    HostResumed,
    HostPaused,
    HostShutdown,
    ListenerRegistered {
        listener: u64,
    },
    ListenerUnregistered {
        listener: u64,
    },
    /// Deferred guard initialisation finished; `started` is set when the host
    /// was already in the foreground.
    GuardInitialized {
        started: bool,
    },
    DeviceStarted {
        device: String,
    },
    DeviceStopped {
        device: String,
    },
    DeviceFailed {
        operation: DeviceOperation,
        code: i32,
    },
}

/// Timestamped entry kept in the collector history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub timestamp_ms: u64,
    #[serde(flatten)]
    pub event: LifecycleEvent,
}
