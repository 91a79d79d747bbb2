use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::AudioError;

use super::AudioDevice;

/// Call recorded by a [`StubDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCall {
    Start,
    Stop,
}

#[derive(Default)]
struct ProbeState {
    running: AtomicBool,
    dropped: AtomicBool,
    fail_starts: AtomicU32,
    fail_stops: AtomicU32,
    calls: Mutex<Vec<DeviceCall>>,
}

/// Shared view into a [`StubDevice`] that stays usable after the device has
/// been moved into a guard.
#[derive(Clone, Default)]
pub struct StubProbe {
    state: Arc<ProbeState>,
}

impl StubProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Whether the device owning this probe has been dropped
    pub fn is_dropped(&self) -> bool {
        self.state.dropped.load(Ordering::SeqCst)
    }

    /// Every start/stop call in order, including failed ones
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state
            .calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn start_count(&self) -> usize {
        self.count(DeviceCall::Start)
    }

    pub fn stop_count(&self) -> usize {
        self.count(DeviceCall::Stop)
    }

    /// Make the next `n` start calls fail with a hardware error
    pub fn fail_next_starts(&self, n: u32) {
        self.state.fail_starts.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` stop calls fail with a hardware error
    pub fn fail_next_stops(&self, n: u32) {
        self.state.fail_stops.store(n, Ordering::SeqCst);
    }

    fn count(&self, kind: DeviceCall) -> usize {
        self.calls().into_iter().filter(|call| *call == kind).count()
    }

    fn record(&self, call: DeviceCall) {
        if let Ok(mut calls) = self.state.calls.lock() {
            calls.push(call);
        }
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// In-memory output device used for deterministic testing and CLI dry runs.
///
/// It performs no audio I/O; every call is recorded on its [`StubProbe`].
pub struct StubDevice {
    name: String,
    probe: StubProbe,
}

impl StubDevice {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_probe(name, StubProbe::new())
    }

    pub fn with_probe(name: impl Into<String>, probe: StubProbe) -> Self {
        Self {
            name: name.into(),
            probe,
        }
    }

    pub fn probe(&self) -> StubProbe {
        self.probe.clone()
    }
}

impl AudioDevice for StubDevice {
    fn start(&mut self) -> Result<(), AudioError> {
        self.probe.record(DeviceCall::Start);
        if StubProbe::take_failure(&self.probe.state.fail_starts) {
            return Err(AudioError::HardwareError {
                details: format!("injected start failure on '{}'", self.name),
            });
        }
        self.probe.state.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.probe.record(DeviceCall::Stop);
        if StubProbe::take_failure(&self.probe.state.fail_stops) {
            return Err(AudioError::HardwareError {
                details: format!("injected stop failure on '{}'", self.name),
            });
        }
        self.probe.state.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for StubDevice {
    fn drop(&mut self) {
        self.probe.state.dropped.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_tracks_running_state() {
        let mut device = StubDevice::new("test");
        let probe = device.probe();

        assert!(!probe.is_running());
        device.start().unwrap();
        assert!(probe.is_running());
        device.stop().unwrap();
        assert!(!probe.is_running());
        assert_eq!(probe.start_count(), 1);
        assert_eq!(probe.stop_count(), 1);
    }

    #[test]
    fn test_injected_start_failure_is_one_shot() {
        let mut device = StubDevice::new("test");
        let probe = device.probe();
        probe.fail_next_starts(1);

        assert!(matches!(
            device.start(),
            Err(AudioError::HardwareError { .. })
        ));
        assert!(!probe.is_running());
        assert!(device.start().is_ok());
        assert!(probe.is_running());
        assert_eq!(probe.start_count(), 2);
    }

    #[test]
    fn test_probe_reports_drop() {
        let device = StubDevice::new("test");
        let probe = device.probe();
        assert!(!probe.is_dropped());
        drop(device);
        assert!(probe.is_dropped());
    }
}
