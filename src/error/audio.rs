// Audio device error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Single source of truth for the codes reported through telemetry and
/// returned to Java callers.
///
/// Error code range: 1001-1006
pub struct AudioErrorCodes;

impl AudioErrorCodes {
    /// No output device is available on this platform
    pub const DEVICE_UNAVAILABLE: i32 = 1001;

    /// Failed to open audio stream
    pub const STREAM_OPEN_FAILED: i32 = 1002;

    /// Hardware error occurred while starting or stopping the stream
    pub const HARDWARE_ERROR: i32 = 1003;

    /// Mutex was poisoned
    pub const LOCK_POISONED: i32 = 1004;

    /// Android context was not initialized before the device was opened
    pub const CONTEXT_NOT_INITIALIZED: i32 = 1005;

    /// Stream owner thread went away
    pub const STREAM_CLOSED: i32 = 1006;
}

/// Log an audio error with structured context
///
/// Fields logged:
/// - error_code: Numeric error code for programmatic handling
/// - component: Always `AudioDevice`
/// - context: The operation that failed
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=AudioDevice, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio device errors
///
/// These errors cover device creation, stream management, and hardware access.
/// The guard never propagates them to its owner; they are logged and recorded
/// as telemetry.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// No output device found
    DeviceUnavailable,

    /// Failed to open audio stream
    StreamOpenFailed { reason: String },

    /// Hardware error occurred
    HardwareError { details: String },

    /// Mutex was poisoned
    LockPoisoned { component: String },

    /// Android context was not initialized before the device was opened
    ContextNotInitialized,

    /// Stream owner thread exited before answering a command
    StreamClosed,
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::DeviceUnavailable => AudioErrorCodes::DEVICE_UNAVAILABLE,
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
            AudioError::LockPoisoned { .. } => AudioErrorCodes::LOCK_POISONED,
            AudioError::ContextNotInitialized => AudioErrorCodes::CONTEXT_NOT_INITIALIZED,
            AudioError::StreamClosed => AudioErrorCodes::STREAM_CLOSED,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::DeviceUnavailable => "No default output device found".to_string(),
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            AudioError::ContextNotInitialized => {
                "Android context not initialized. Call LifecycleBridge.nativeInit() first.".to_string()
            }
            AudioError::StreamClosed => "Audio stream owner thread has exited".to_string(),
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::HardwareError {
            details: err.to_string(),
        }
    }
}
