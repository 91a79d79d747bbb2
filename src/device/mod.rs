//! Audio device abstractions and platform backends.
//!
//! The guard only ever needs two things from an audio SDK: start the output
//! stream and stop it. [`AudioDevice`] captures exactly that. Backends:
//!
//! - [`CpalOutputDevice`] on desktop (Linux/macOS/Windows)
//! - [`OboeOutputDevice`] on Android
//! - [`StubDevice`] everywhere, for tests and dry runs

use crate::config::{DeviceBackendKind, DeviceConfig};
use crate::error::AudioError;

/// Trait implemented by audio output devices driven by the guard.
///
/// Devices are created on the host thread and only ever touched from there,
/// but they live inside a listener shared with the host, hence `Send`.
pub trait AudioDevice: Send {
    fn start(&mut self) -> Result<(), AudioError>;
    fn stop(&mut self) -> Result<(), AudioError>;

    /// Human-readable device name used in logs and telemetry.
    fn name(&self) -> &str;
}

impl<D: AudioDevice + ?Sized> AudioDevice for Box<D> {
    fn start(&mut self) -> Result<(), AudioError> {
        (**self).start()
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        (**self).stop()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

mod stub;
mod tone;

pub use stub::{DeviceCall, StubDevice, StubProbe};
pub use tone::SineTone;

cfg_if::cfg_if! {
    if #[cfg(target_os = "android")] {
        mod oboe_output;
        pub use oboe_output::OboeOutputDevice;

        /// Output device used for [`DeviceBackendKind::Platform`].
        pub type PlatformDevice = OboeOutputDevice;
    } else {
        mod cpal_output;
        pub use cpal_output::CpalOutputDevice;

        /// Output device used for [`DeviceBackendKind::Platform`].
        pub type PlatformDevice = CpalOutputDevice;
    }
}

/// Open the device selected by `config.backend`.
///
/// Must be called on the thread that will own the device; the guard does
/// this from its deferred initialisation task on the host thread.
pub fn open_device(config: &DeviceConfig) -> Result<Box<dyn AudioDevice>, AudioError> {
    match config.backend {
        DeviceBackendKind::Platform => {
            let device = PlatformDevice::open(config)?;
            log::info!("[Device] Opened platform output device '{}'", device.name());
            Ok(Box::new(device))
        }
        DeviceBackendKind::Stub => Ok(Box::new(StubDevice::new("stub"))),
    }
}
