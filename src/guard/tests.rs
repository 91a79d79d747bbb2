use super::*;

use std::sync::atomic::AtomicBool;
use std::sync::mpsc;

use crate::config::HostConfig;
use crate::device::{DeviceCall, StubDevice, StubProbe};
use crate::error::AudioErrorCodes;
use crate::host::EventLoopHost;

fn spawn_host(start_paused: bool) -> (Arc<EventLoopHost>, Arc<TelemetryCollector>) {
    let telemetry = Arc::new(TelemetryCollector::new(64, 128));
    let config = HostConfig {
        start_paused,
        ..HostConfig::default()
    };
    let host = EventLoopHost::spawn_with_telemetry(&config, Arc::clone(&telemetry))
        .expect("host should spawn");
    (host, telemetry)
}

fn stub_guard(host: &Arc<EventLoopHost>) -> (AudioDeviceGuard, StubProbe) {
    let device = StubDevice::new("stub");
    let probe = device.probe();
    let guard = AudioDeviceGuard::new(host, move || Ok(device)).expect("guard should schedule");
    (guard, probe)
}

fn events(telemetry: &TelemetryCollector) -> Vec<LifecycleEvent> {
    telemetry.snapshot().events()
}

#[test]
fn constructed_while_paused_waits_for_first_resume() {
    let (host, _) = spawn_host(true);
    let (guard, probe) = stub_guard(&host);
    host.flush().unwrap();

    assert_eq!(guard.state(), GuardState::Stopped);
    assert_eq!(probe.start_count(), 0);
    assert_eq!(host.listener_count(), 1);

    host.resume().unwrap();
    host.flush().unwrap();

    assert!(probe.is_running());
    assert_eq!(guard.state(), GuardState::Running);
    assert_eq!(probe.calls(), vec![DeviceCall::Start]);
}

#[test]
fn constructed_while_resumed_starts_without_resume_event() {
    let (host, telemetry) = spawn_host(false);
    let (guard, probe) = stub_guard(&host);
    host.flush().unwrap();

    assert!(probe.is_running());
    assert_eq!(probe.start_count(), 1);
    assert_eq!(guard.state(), GuardState::Running);
    assert!(events(&telemetry).contains(&LifecycleEvent::GuardInitialized { started: true }));
}

#[test]
fn constructed_after_host_resumed_starts_device() {
    let (host, _) = spawn_host(true);
    host.resume().unwrap();
    host.flush().unwrap();

    let (guard, probe) = stub_guard(&host);
    host.flush().unwrap();

    assert!(probe.is_running());
    assert_eq!(guard.state(), GuardState::Running);
}

#[test]
fn resume_queued_behind_initialisation_starts_once() {
    let (host, _) = spawn_host(true);
    let (guard, probe) = stub_guard(&host);
    host.resume().unwrap();
    host.flush().unwrap();

    assert_eq!(probe.calls(), vec![DeviceCall::Start]);
    assert_eq!(guard.state(), GuardState::Running);
}

#[test]
fn construction_does_not_wait_for_host_thread() {
    let (host, _) = spawn_host(false);
    let (release_tx, release_rx) = mpsc::channel::<()>();
    host.run_on_host_thread(Box::new(move || {
        let _ = release_rx.recv();
    }))
    .unwrap();

    // Host thread is blocked; construction must still return
    let (guard, probe) = stub_guard(&host);
    assert_eq!(guard.state(), GuardState::Pending);
    assert_eq!(probe.start_count(), 0);

    release_tx.send(()).unwrap();
    host.flush().unwrap();
    assert_eq!(guard.state(), GuardState::Running);
}

#[test]
fn device_state_follows_latest_callback() {
    let (host, _) = spawn_host(true);
    let (guard, probe) = stub_guard(&host);
    host.flush().unwrap();

    let sequence = [true, true, false, true, false, false, true, false, true, true];
    for resume in sequence {
        if resume {
            guard.core.on_resume();
        } else {
            guard.core.on_pause();
        }
        assert_eq!(probe.is_running(), resume);
    }

    // Redundant callbacks never reach the device
    let calls = probe.calls();
    for pair in calls.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
}

#[test]
fn host_transitions_drive_device() {
    let (host, telemetry) = spawn_host(true);
    let (_guard, probe) = stub_guard(&host);

    host.resume().unwrap();
    host.pause().unwrap();
    host.resume().unwrap();
    host.flush().unwrap();

    assert!(probe.is_running());
    assert_eq!(
        probe.calls(),
        vec![DeviceCall::Start, DeviceCall::Stop, DeviceCall::Start]
    );
    let started = events(&telemetry)
        .into_iter()
        .filter(|event| matches!(event, LifecycleEvent::DeviceStarted { .. }))
        .count();
    assert_eq!(started, 2);
}

#[test]
fn unregister_twice_is_safe() {
    let (host, _) = spawn_host(true);
    let (guard, _probe) = stub_guard(&host);
    host.flush().unwrap();

    guard.unregister();
    guard.unregister();

    assert_eq!(guard.state(), GuardState::Detached);
    assert_eq!(host.listener_count(), 0);
}

#[test]
fn unregister_after_host_destroyed_is_noop() {
    let (host, _) = spawn_host(false);
    let (guard, probe) = stub_guard(&host);
    host.flush().unwrap();

    drop(host);
    guard.unregister();
    guard.unregister();

    assert_eq!(guard.state(), GuardState::Detached);
    assert!(probe.is_running());
}

#[test]
fn no_callbacks_after_unregister() {
    let (host, _) = spawn_host(false);
    let (guard, probe) = stub_guard(&host);
    host.flush().unwrap();
    assert!(probe.is_running());

    guard.unregister();
    host.pause().unwrap();
    host.flush().unwrap();

    // A callback already in flight on the host is ignored as well
    guard.core.on_pause();

    assert!(probe.is_running());
    assert_eq!(probe.stop_count(), 0);
}

#[test]
fn unregister_before_initialisation_skips_device_creation() {
    let (host, _) = spawn_host(false);
    let (release_tx, release_rx) = mpsc::channel::<()>();
    host.run_on_host_thread(Box::new(move || {
        let _ = release_rx.recv();
    }))
    .unwrap();

    let created = Arc::new(AtomicBool::new(false));
    let created_flag = Arc::clone(&created);
    let guard = AudioDeviceGuard::new(&host, move || {
        created_flag.store(true, Ordering::SeqCst);
        Ok(StubDevice::new("never"))
    })
    .unwrap();

    guard.unregister();
    release_tx.send(()).unwrap();
    host.flush().unwrap();

    assert!(!created.load(Ordering::SeqCst));
    assert_eq!(host.listener_count(), 0);
    assert_eq!(guard.state(), GuardState::Detached);
}

#[test]
fn creation_failure_leaves_guard_inert() {
    let (host, telemetry) = spawn_host(false);
    let guard = AudioDeviceGuard::new(&host, || {
        Err::<StubDevice, _>(AudioError::DeviceUnavailable)
    })
    .unwrap();
    host.flush().unwrap();

    assert_eq!(guard.state(), GuardState::Failed);
    assert_eq!(host.listener_count(), 0);
    assert!(events(&telemetry).contains(&LifecycleEvent::DeviceFailed {
        operation: DeviceOperation::Create,
        code: AudioErrorCodes::DEVICE_UNAVAILABLE,
    }));

    guard.core.on_resume();
    assert_eq!(guard.state(), GuardState::Failed);
}

#[test]
fn failed_start_is_retried_on_next_resume() {
    let (host, telemetry) = spawn_host(false);
    let device = StubDevice::new("flaky");
    let probe = device.probe();
    probe.fail_next_starts(1);
    let guard = AudioDeviceGuard::new(&host, move || Ok(device)).unwrap();
    host.flush().unwrap();

    assert_eq!(guard.state(), GuardState::Stopped);
    assert!(events(&telemetry).contains(&LifecycleEvent::DeviceFailed {
        operation: DeviceOperation::Start,
        code: AudioErrorCodes::HARDWARE_ERROR,
    }));
    assert!(events(&telemetry).contains(&LifecycleEvent::GuardInitialized { started: false }));

    host.pause().unwrap();
    host.resume().unwrap();
    host.flush().unwrap();

    assert_eq!(guard.state(), GuardState::Running);
    assert_eq!(probe.start_count(), 2);
}

#[test]
fn construction_on_shut_down_host_fails() {
    let (host, _) = spawn_host(true);
    host.shutdown();

    let result = AudioDeviceGuard::new(&host, || Ok(StubDevice::new("late")));
    assert!(matches!(result, Err(HostError::ShutDown)));
}

#[test]
fn dropping_guard_unregisters_and_releases_device() {
    let (host, _) = spawn_host(false);
    let (guard, probe) = stub_guard(&host);
    host.flush().unwrap();
    assert_eq!(host.listener_count(), 1);

    drop(guard);

    assert_eq!(host.listener_count(), 0);
    assert!(probe.is_dropped());
}

#[test]
fn guard_from_stub_config_follows_host() {
    let (host, _) = spawn_host(true);
    let config = DeviceConfig {
        backend: crate::config::DeviceBackendKind::Stub,
        ..DeviceConfig::default()
    };
    let guard = AudioDeviceGuard::from_config(&host, &config).unwrap();
    host.flush().unwrap();
    assert_eq!(guard.state(), GuardState::Stopped);

    host.resume().unwrap();
    host.flush().unwrap();
    assert_eq!(guard.state(), GuardState::Running);
}
