//! AudioDeviceGuard: keeps an audio output device running exactly while the
//! host is in the foreground.
//!
//! Construction posts a one-shot initialisation task to the host thread and
//! returns immediately. That task creates the device, registers the guard as a
//! lifecycle listener and, if the host is already resumed, starts the device
//! right away, since no resume event will arrive for a transition that has
//! already happened. From then on `on_resume`/`on_pause` start and stop the
//! device on the host thread.
//!
//! Device failures are never surfaced to the owner: they are logged and
//! recorded as telemetry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::{Deserialize, Serialize};

use crate::config::DeviceConfig;
use crate::device::{self, AudioDevice};
use crate::error::{log_audio_error, AudioError, ErrorCode, HostError};
use crate::host::{HostActivity, LifecycleListener, ListenerId};
use crate::telemetry::{DeviceOperation, LifecycleEvent, TelemetryCollector};

/// Observable phase of a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardState {
    /// Initialisation task has not run yet
    Pending,
    Running,
    Stopped,
    /// Device creation failed; the guard is inert
    Failed,
    /// `unregister` has been called
    Detached,
}

enum DeviceSlot {
    Pending,
    Failed,
    Ready {
        device: Box<dyn AudioDevice>,
        running: bool,
    },
}

/// Listener half of the guard, shared with the host's listener set.
struct GuardCore {
    slot: Mutex<DeviceSlot>,
    /// Serialises registration against `unregister`
    registration: Mutex<Option<ListenerId>>,
    detached: AtomicBool,
    telemetry: Arc<TelemetryCollector>,
}

impl GuardCore {
    fn new(telemetry: Arc<TelemetryCollector>) -> Self {
        Self {
            slot: Mutex::new(DeviceSlot::Pending),
            registration: Mutex::new(None),
            detached: AtomicBool::new(false),
            telemetry,
        }
    }

    fn lock_slot(&self) -> Result<MutexGuard<'_, DeviceSlot>, AudioError> {
        self.slot.lock().map_err(|_| AudioError::LockPoisoned {
            component: "guard_device".to_string(),
        })
    }

    fn lock_registration(&self) -> MutexGuard<'_, Option<ListenerId>> {
        self.registration
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    /// Deferred initialisation; runs on the host thread.
    fn initialize<F>(self: &Arc<Self>, host: &Weak<dyn HostActivity>, create_device: F)
    where
        F: FnOnce() -> Result<Box<dyn AudioDevice>, AudioError>,
    {
        if self.is_detached() {
            log::debug!("[Guard] Unregistered before initialisation, skipping device creation");
            return;
        }
        let Some(host) = host.upgrade() else {
            log::warn!("[Guard] Host dropped before initialisation");
            return;
        };

        let device = match create_device() {
            Ok(device) => device,
            Err(err) => {
                log_audio_error(&err, "create_device");
                self.record_failure(DeviceOperation::Create, &err);
                if let Ok(mut slot) = self.lock_slot() {
                    *slot = DeviceSlot::Failed;
                }
                return;
            }
        };
        log::info!("[Guard] Created audio device '{}'", device.name());

        match self.lock_slot() {
            Ok(mut slot) => {
                *slot = DeviceSlot::Ready {
                    device,
                    running: false,
                }
            }
            Err(err) => {
                log_audio_error(&err, "initialize");
                return;
            }
        }

        {
            let mut registration = self.lock_registration();
            if self.is_detached() {
                log::debug!("[Guard] Unregistered during device creation, not registering");
                return;
            }
            let listener: Arc<dyn LifecycleListener> = self.clone();
            match host.register_listener(listener) {
                Some(id) => *registration = Some(id),
                None => {
                    log::warn!("[Guard] Host is shutting down, device left stopped");
                    return;
                }
            }
        }

        // A resume that happened before registration will never be redelivered
        let started = !host.is_paused() && self.drive(true);
        log::info!("[Guard] Initialised (started={})", started);
        self.telemetry
            .record(LifecycleEvent::GuardInitialized { started });
    }

    /// Bring the device to the requested state. Returns whether it is running
    /// afterwards.
    fn drive(&self, run: bool) -> bool {
        let action = if run { "resume" } else { "pause" };
        if self.is_detached() {
            log::debug!("[Guard] Ignoring {} after unregister", action);
            return false;
        }

        let mut slot = match self.lock_slot() {
            Ok(slot) => slot,
            Err(err) => {
                log_audio_error(&err, action);
                return false;
            }
        };

        match &mut *slot {
            DeviceSlot::Pending => {
                log::debug!("[Guard] Ignoring {} before device creation", action);
                false
            }
            DeviceSlot::Failed => {
                log::debug!("[Guard] Ignoring {}: device creation failed", action);
                false
            }
            DeviceSlot::Ready { device, running } => {
                if *running == run {
                    log::debug!("[Guard] Device already {}", if run { "running" } else { "stopped" });
                    return *running;
                }

                let (result, operation) = if run {
                    (device.start(), DeviceOperation::Start)
                } else {
                    (device.stop(), DeviceOperation::Stop)
                };

                match result {
                    Ok(()) => {
                        *running = run;
                        let name = device.name().to_string();
                        log::info!(
                            "[Guard] Device '{}' {}",
                            name,
                            if run { "started" } else { "stopped" }
                        );
                        self.telemetry.record(if run {
                            LifecycleEvent::DeviceStarted { device: name }
                        } else {
                            LifecycleEvent::DeviceStopped { device: name }
                        });
                    }
                    Err(err) => {
                        log_audio_error(&err, if run { "start_device" } else { "stop_device" });
                        self.record_failure(operation, &err);
                    }
                }
                *running
            }
        }
    }

    fn record_failure(&self, operation: DeviceOperation, err: &AudioError) {
        self.telemetry.record(LifecycleEvent::DeviceFailed {
            operation,
            code: err.code(),
        });
    }

    fn state(&self) -> GuardState {
        if self.is_detached() {
            return GuardState::Detached;
        }
        match self.lock_slot() {
            Ok(slot) => match &*slot {
                DeviceSlot::Pending => GuardState::Pending,
                DeviceSlot::Failed => GuardState::Failed,
                DeviceSlot::Ready { running: true, .. } => GuardState::Running,
                DeviceSlot::Ready { running: false, .. } => GuardState::Stopped,
            },
            Err(_) => GuardState::Failed,
        }
    }
}

impl LifecycleListener for GuardCore {
    fn on_resume(&self) {
        self.drive(true);
    }

    fn on_pause(&self) {
        self.drive(false);
    }
}

/// Binds one audio device to one host listener registration.
///
/// The owner must call [`unregister`](Self::unregister) before discarding the
/// guard; dropping it does so as well.
pub struct AudioDeviceGuard {
    core: Arc<GuardCore>,
    host: Weak<dyn HostActivity>,
}

impl AudioDeviceGuard {
    /// Schedule device creation and listener registration on the host thread.
    ///
    /// Returns before the device exists. `create_device` runs on the host
    /// thread.
    ///
    /// # Errors
    /// `HostError::ShutDown` if the host refuses the initialisation task.
    pub fn new<H, F, D>(host: &Arc<H>, create_device: F) -> Result<Self, HostError>
    where
        H: HostActivity + 'static,
        F: FnOnce() -> Result<D, AudioError> + Send + 'static,
        D: AudioDevice + 'static,
    {
        let host_dyn: Arc<dyn HostActivity> = host.clone();
        let weak_host = Arc::downgrade(&host_dyn);
        let core = Arc::new(GuardCore::new(host.telemetry()));

        let task_core = Arc::clone(&core);
        let task_host = weak_host.clone();
        host.run_on_host_thread(Box::new(move || {
            task_core.initialize(&task_host, move || {
                create_device().map(|device| Box::new(device) as Box<dyn AudioDevice>)
            });
        }))?;

        log::debug!("[Guard] Initialisation scheduled on host thread");
        Ok(Self {
            core,
            host: weak_host,
        })
    }

    /// Guard over the device described by `config` (see [`device::open_device`]).
    pub fn from_config<H>(host: &Arc<H>, config: &DeviceConfig) -> Result<Self, HostError>
    where
        H: HostActivity + 'static,
    {
        let config = config.clone();
        Self::new(host, move || device::open_device(&config))
    }

    /// Remove this guard from the host's listener set.
    ///
    /// Idempotent. A no-op when the host has already been torn down. Once it
    /// returns, no further lifecycle callbacks reach the device, and an
    /// initialisation task that has not run yet will not create one.
    pub fn unregister(&self) {
        let id = {
            let mut registration = self.core.lock_registration();
            self.core.detached.store(true, Ordering::SeqCst);
            registration.take()
        };

        let Some(id) = id else {
            return;
        };

        match self.host.upgrade() {
            Some(host) => {
                if host.unregister_listener(id) {
                    log::info!("[Guard] Unregistered {}", id);
                } else {
                    log::debug!("[Guard] {} was no longer registered", id);
                }
            }
            None => log::debug!("[Guard] Host already torn down, nothing to unregister"),
        }
    }

    pub fn state(&self) -> GuardState {
        self.core.state()
    }
}

impl Drop for AudioDeviceGuard {
    fn drop(&mut self) {
        self.unregister();
    }
}

#[cfg(test)]
mod tests;
