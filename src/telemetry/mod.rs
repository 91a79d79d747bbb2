//! Lifecycle telemetry collector.
//!
//! The collector keeps a bounded history of [`LifecycleEvent`]s and fans each
//! one out on a tokio broadcast channel. Hosts and guards take an explicit
//! collector; [`hub`] returns the process-wide default.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use tokio::sync::broadcast;

pub mod events;

pub use events::{DeviceOperation, LifecycleEvent, TelemetryRecord};

/// Global collector shared across the crate.
static HUB: Lazy<Arc<TelemetryCollector>> = Lazy::new(|| Arc::new(TelemetryCollector::default()));

/// Access the global telemetry collector.
pub fn hub() -> Arc<TelemetryCollector> {
    Arc::clone(&HUB)
}

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<TelemetryRecord>,
    pub total_events: u64,
    pub dropped_events: u64,
}

impl TelemetrySnapshot {
    /// Events in the retained history, oldest first, without timestamps.
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.recent.iter().map(|record| record.event.clone()).collect()
    }
}

/// Broadcast-based collector retaining a bounded history of lifecycle events.
pub struct TelemetryCollector {
    tx: broadcast::Sender<TelemetryRecord>,
    history: Mutex<VecDeque<TelemetryRecord>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn record(&self, event: LifecycleEvent) {
        let record = TelemetryRecord {
            timestamp_ms: now_timestamp_ms(),
            event,
        };

        self.total_events.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = self.lock_history();
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            if self.history_capacity > 0 {
                history.push_back(record.clone());
            }
        }

        // No subscribers is not an error
        let _ = self.tx.send(record);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryRecord> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = self.lock_history();
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }

    // A panic while holding the lock leaves the VecDeque intact
    fn lock_history(&self) -> MutexGuard<'_, VecDeque<TelemetryRecord>> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 128)
    }
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_preserves_order_within_history() {
        let collector = TelemetryCollector::new(8, 3);
        collector.record(LifecycleEvent::HostResumed);
        collector.record(LifecycleEvent::DeviceStarted {
            device: "stub".to_string(),
        });
        collector.record(LifecycleEvent::HostPaused);

        let events = collector.snapshot().events();
        assert_eq!(
            events,
            vec![
                LifecycleEvent::HostResumed,
                LifecycleEvent::DeviceStarted {
                    device: "stub".to_string()
                },
                LifecycleEvent::HostPaused,
            ]
        );
    }

    #[test]
    fn collector_drops_history_when_full() {
        let collector = TelemetryCollector::new(8, 2);
        collector.record(LifecycleEvent::HostResumed);
        collector.record(LifecycleEvent::HostPaused);
        collector.record(LifecycleEvent::HostShutdown);

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.recent.len(), 2);
        assert_eq!(snapshot.total_events, 3);
        assert_eq!(snapshot.dropped_events, 1);
        assert_eq!(snapshot.recent[0].event, LifecycleEvent::HostPaused);
    }

    #[test]
    fn subscribers_receive_records() {
        let collector = TelemetryCollector::new(8, 8);
        let mut rx = collector.subscribe();
        collector.record(LifecycleEvent::GuardInitialized { started: true });

        let record = rx.try_recv().unwrap();
        assert_eq!(record.event, LifecycleEvent::GuardInitialized { started: true });
    }

    #[test]
    fn records_serialize_with_type_tag() {
        let record = TelemetryRecord {
            timestamp_ms: 7,
            event: LifecycleEvent::DeviceFailed {
                operation: DeviceOperation::Start,
                code: 1003,
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "device_failed");
        assert_eq!(json["payload"]["operation"], "start");
        assert_eq!(json["timestamp_ms"], 7);
    }
}
