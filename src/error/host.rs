// Host event-loop error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Host error code constants
///
/// Error code range: 2001-2003
pub struct HostErrorCodes;

impl HostErrorCodes {
    /// Host has been shut down and no longer accepts tasks
    pub const SHUT_DOWN: i32 = 2001;

    /// Blocking call issued from the host thread itself
    pub const WOULD_DEADLOCK: i32 = 2002;

    /// Host thread could not be spawned
    pub const SPAWN_FAILED: i32 = 2003;
}

/// Log a host error with structured context
pub fn log_host_error(err: &HostError, context: &str) {
    error!(
        "Host error in {}: code={}, component=HostEventLoop, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by the host event loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host queue is closed
    ShutDown,

    /// The caller is running on the host thread and would wait on itself
    WouldDeadlock,

    /// Failed to spawn the host thread or its runtime
    SpawnFailed { reason: String },
}

impl ErrorCode for HostError {
    fn code(&self) -> i32 {
        match self {
            HostError::ShutDown => HostErrorCodes::SHUT_DOWN,
            HostError::WouldDeadlock => HostErrorCodes::WOULD_DEADLOCK,
            HostError::SpawnFailed { .. } => HostErrorCodes::SPAWN_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            HostError::ShutDown => "Host event loop has shut down".to_string(),
            HostError::WouldDeadlock => {
                "Blocking host call issued from the host thread".to_string()
            }
            HostError::SpawnFailed { reason } => {
                format!("Failed to spawn host event loop: {}", reason)
            }
        }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HostError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for HostError {}
