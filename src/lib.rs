// Audio Lifecycle - keeps a native audio output device running exactly while
// the host application is in the foreground

// Module declarations
pub mod config;
pub mod device;
pub mod error;
pub mod guard;
pub mod host;
pub mod logging;
pub mod telemetry;

#[cfg(target_os = "android")]
pub mod android;

// Re-exports for convenience
pub use config::AppConfig;
pub use device::{AudioDevice, StubDevice};
pub use error::{AudioError, ErrorCode, HostError};
pub use guard::{AudioDeviceGuard, GuardState};
pub use host::{EventLoopHost, HostActivity, LifecycleListener, ListenerId};
pub use logging::init_logging;
