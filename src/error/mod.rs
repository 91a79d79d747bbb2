// Error types for the audio lifecycle guard
//
// This module defines custom error types for audio device and host event-loop
// operations, providing structured error handling with numeric codes suitable
// for crossing the JNI boundary.

mod audio;
mod host;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use host::{log_host_error, HostError, HostErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the FFI boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
