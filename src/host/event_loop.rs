//! EventLoopHost: a single-threaded FIFO host.
//!
//! Every task and every lifecycle transition goes through one unbounded tokio
//! channel drained by a dedicated thread running a current-thread runtime, so
//! work executes strictly in the order it was queued. Listener callbacks run
//! on that thread.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle, ThreadId};

use tokio::sync::mpsc;

use crate::config::HostConfig;
use crate::error::{log_host_error, HostError};
use crate::telemetry::{self, LifecycleEvent, TelemetryCollector};

use super::{HostActivity, HostTask, LifecycleListener, ListenerId};

/// Foreground/background transition requested on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Resume,
    Pause,
}

enum HostMessage {
    Run(HostTask),
    Transition(Transition),
}

type ListenerEntry = (ListenerId, Arc<dyn LifecycleListener>);

/// State shared between the host handle and its thread.
struct HostShared {
    paused: AtomicBool,
    accepting: AtomicBool,
    next_listener: AtomicU64,
    listeners: Mutex<Vec<ListenerEntry>>,
    telemetry: Arc<TelemetryCollector>,
}

impl HostShared {
    fn lock_listeners(&self) -> MutexGuard<'_, Vec<ListenerEntry>> {
        // Entries are plain Arcs; a panicking holder cannot leave them torn
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn apply_transition(&self, transition: Transition) {
        let pause = transition == Transition::Pause;
        if self.paused.swap(pause, Ordering::SeqCst) == pause {
            tracing::debug!("[Host] Ignoring {:?}: state unchanged", transition);
            return;
        }

        self.telemetry.record(if pause {
            LifecycleEvent::HostPaused
        } else {
            LifecycleEvent::HostResumed
        });

        // Snapshot so listeners may unregister themselves from a callback
        let listeners: Vec<Arc<dyn LifecycleListener>> = self
            .lock_listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        tracing::debug!(
            "[Host] Dispatching {:?} to {} listener(s)",
            transition,
            listeners.len()
        );
        for listener in listeners {
            if pause {
                listener.on_pause();
            } else {
                listener.on_resume();
            }
        }
    }
}

async fn run_event_loop(shared: Arc<HostShared>, mut rx: mpsc::UnboundedReceiver<HostMessage>) {
    tracing::info!("[Host] Event loop started");

    while let Some(message) = rx.recv().await {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| match message {
            HostMessage::Run(task) => task(),
            HostMessage::Transition(transition) => shared.apply_transition(transition),
        }));
        if outcome.is_err() {
            tracing::error!("[Host] Task panicked; continuing with next task");
        }
    }

    shared.lock_listeners().clear();
    tracing::info!("[Host] Event loop drained, exiting");
}

/// Host running lifecycle work on a dedicated FIFO thread.
///
/// # Example
/// ```ignore
/// let host = EventLoopHost::spawn(&HostConfig::default())?;
/// host.resume()?;
/// host.flush()?;
/// assert!(!host.is_paused());
/// ```
pub struct EventLoopHost {
    shared: Arc<HostShared>,
    sender: Mutex<Option<mpsc::UnboundedSender<HostMessage>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl EventLoopHost {
    /// Spawn a host recording into the global telemetry hub.
    pub fn spawn(config: &HostConfig) -> Result<Arc<Self>, HostError> {
        Self::spawn_with_telemetry(config, telemetry::hub())
    }

    pub fn spawn_with_telemetry(
        config: &HostConfig,
        telemetry: Arc<TelemetryCollector>,
    ) -> Result<Arc<Self>, HostError> {
        let shared = Arc::new(HostShared {
            paused: AtomicBool::new(config.start_paused),
            accepting: AtomicBool::new(true),
            next_listener: AtomicU64::new(1),
            listeners: Mutex::new(Vec::new()),
            telemetry,
        });

        let (tx, rx) = mpsc::unbounded_channel();

        // Built here so a failure reaches the caller instead of the thread
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| HostError::SpawnFailed {
                reason: e.to_string(),
            })?;

        let loop_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || runtime.block_on(run_event_loop(loop_shared, rx)))
            .map_err(|e| HostError::SpawnFailed {
                reason: e.to_string(),
            })?;
        let thread_id = worker.thread().id();

        tracing::info!(
            "[Host] Spawned '{}' (start_paused={})",
            config.thread_name,
            config.start_paused
        );

        Ok(Arc::new(Self {
            shared,
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            thread_id,
        }))
    }

    /// Queue a foreground transition.
    pub fn resume(&self) -> Result<(), HostError> {
        self.post(HostMessage::Transition(Transition::Resume))
    }

    /// Queue a background transition.
    pub fn pause(&self) -> Result<(), HostError> {
        self.post(HostMessage::Transition(Transition::Pause))
    }

    pub fn transition(&self, transition: Transition) -> Result<(), HostError> {
        self.post(HostMessage::Transition(transition))
    }

    /// Block until everything queued before this call has run.
    ///
    /// # Errors
    /// - `WouldDeadlock` when called from the host thread
    /// - `ShutDown` when the host no longer accepts work
    pub fn flush(&self) -> Result<(), HostError> {
        if self.is_host_thread() {
            return Err(HostError::WouldDeadlock);
        }
        let (done_tx, done_rx) = std_mpsc::channel();
        self.post(HostMessage::Run(Box::new(move || {
            let _ = done_tx.send(());
        })))?;
        done_rx.recv().map_err(|_| HostError::ShutDown)
    }

    pub fn is_host_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Whether the host still accepts tasks and listeners.
    pub fn is_live(&self) -> bool {
        self.shared.accepting.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.shared.lock_listeners().len()
    }

    /// Stop accepting work, run what is already queued, drop all listeners
    /// and join the host thread. Idempotent.
    ///
    /// Called from the host thread itself, the thread is detached instead of
    /// joined; it still drains and exits.
    pub fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if sender.is_none() {
            return;
        }

        self.shared.accepting.store(false, Ordering::SeqCst);
        drop(sender);

        if !self.is_host_thread() {
            let worker = self
                .worker
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .take();
            if let Some(worker) = worker {
                if worker.join().is_err() {
                    tracing::error!("[Host] Event loop thread panicked");
                }
            }
        }

        self.shared.telemetry.record(LifecycleEvent::HostShutdown);
        tracing::info!("[Host] Shut down");
    }

    fn post(&self, message: HostMessage) -> Result<(), HostError> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let result = match sender.as_ref() {
            Some(tx) => tx.send(message).map_err(|_| HostError::ShutDown),
            None => Err(HostError::ShutDown),
        };
        if let Err(err) = &result {
            log_host_error(err, "post");
        }
        result
    }
}

impl HostActivity for EventLoopHost {
    fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::SeqCst)
    }

    fn register_listener(&self, listener: Arc<dyn LifecycleListener>) -> Option<ListenerId> {
        let mut listeners = self.shared.lock_listeners();
        if !self.is_live() {
            tracing::warn!("[Host] Rejecting listener registration during shutdown");
            return None;
        }

        let id = ListenerId::new(self.shared.next_listener.fetch_add(1, Ordering::SeqCst));
        listeners.push((id, listener));
        drop(listeners);

        self.shared
            .telemetry
            .record(LifecycleEvent::ListenerRegistered {
                listener: id.as_u64(),
            });
        tracing::debug!("[Host] Registered {}", id);
        Some(id)
    }

    fn unregister_listener(&self, id: ListenerId) -> bool {
        let removed = {
            let mut listeners = self.shared.lock_listeners();
            let before = listeners.len();
            listeners.retain(|(entry, _)| *entry != id);
            listeners.len() != before
        };

        if removed {
            self.shared
                .telemetry
                .record(LifecycleEvent::ListenerUnregistered {
                    listener: id.as_u64(),
                });
            tracing::debug!("[Host] Unregistered {}", id);
        }
        removed
    }

    fn run_on_host_thread(&self, task: HostTask) -> Result<(), HostError> {
        self.post(HostMessage::Run(task))
    }

    fn telemetry(&self) -> Arc<TelemetryCollector> {
        Arc::clone(&self.shared.telemetry)
    }
}

impl Drop for EventLoopHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn test_host(start_paused: bool) -> (Arc<EventLoopHost>, Arc<TelemetryCollector>) {
        let telemetry = Arc::new(TelemetryCollector::new(64, 64));
        let config = HostConfig {
            start_paused,
            ..HostConfig::default()
        };
        let host = EventLoopHost::spawn_with_telemetry(&config, Arc::clone(&telemetry)).unwrap();
        (host, telemetry)
    }

    #[derive(Default)]
    struct CountingListener {
        resumes: AtomicUsize,
        pauses: AtomicUsize,
    }

    impl LifecycleListener for CountingListener {
        fn on_resume(&self) {
            self.resumes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_pause(&self) {
            self.pauses.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn tasks_run_in_fifo_order_on_host_thread() {
        let (host, _) = test_host(true);
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..10 {
            let order = Arc::clone(&order);
            let probe = Arc::clone(&host);
            host.run_on_host_thread(Box::new(move || {
                order.lock().unwrap().push((i, probe.is_host_thread()));
            }))
            .unwrap();
        }
        host.flush().unwrap();

        let expected: Vec<(i32, bool)> = (0..10).map(|i| (i, true)).collect();
        assert_eq!(*order.lock().unwrap(), expected);
    }

    #[test]
    fn transitions_update_state_and_notify_listeners() {
        let (host, telemetry) = test_host(true);
        let listener = Arc::new(CountingListener::default());
        host.register_listener(listener.clone()).unwrap();

        host.resume().unwrap();
        host.flush().unwrap();
        assert!(!host.is_paused());
        assert_eq!(listener.resumes.load(Ordering::SeqCst), 1);

        host.pause().unwrap();
        host.flush().unwrap();
        assert!(host.is_paused());
        assert_eq!(listener.pauses.load(Ordering::SeqCst), 1);

        let events = telemetry.snapshot().events();
        assert!(events.contains(&LifecycleEvent::HostResumed));
        assert!(events.contains(&LifecycleEvent::HostPaused));
    }

    #[test]
    fn duplicate_transitions_are_not_dispatched() {
        let (host, _) = test_host(false);
        let listener = Arc::new(CountingListener::default());
        host.register_listener(listener.clone()).unwrap();

        host.resume().unwrap();
        host.resume().unwrap();
        host.pause().unwrap();
        host.pause().unwrap();
        host.flush().unwrap();

        assert_eq!(listener.resumes.load(Ordering::SeqCst), 0);
        assert_eq!(listener.pauses.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregistered_listener_receives_nothing() {
        let (host, _) = test_host(true);
        let listener = Arc::new(CountingListener::default());
        let id = host.register_listener(listener.clone()).unwrap();

        assert!(host.unregister_listener(id));
        assert!(!host.unregister_listener(id));
        assert_eq!(host.listener_count(), 0);

        host.resume().unwrap();
        host.flush().unwrap();
        assert_eq!(listener.resumes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn flush_from_host_thread_reports_deadlock() {
        let (host, _) = test_host(true);
        let (tx, rx) = std_mpsc::channel();
        let inner = Arc::clone(&host);
        host.run_on_host_thread(Box::new(move || {
            let _ = tx.send(inner.flush());
        }))
        .unwrap();

        assert_eq!(rx.recv().unwrap(), Err(HostError::WouldDeadlock));
    }

    #[test]
    fn shutdown_drains_queue_then_rejects_work() {
        let (host, telemetry) = test_host(true);
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        host.run_on_host_thread(Box::new(move || flag.store(true, Ordering::SeqCst)))
            .unwrap();

        host.shutdown();
        assert!(ran.load(Ordering::SeqCst));
        assert!(!host.is_live());
        assert_eq!(
            host.run_on_host_thread(Box::new(|| {})),
            Err(HostError::ShutDown)
        );
        assert_eq!(host.flush(), Err(HostError::ShutDown));
        assert!(host
            .register_listener(Arc::new(CountingListener::default()))
            .is_none());

        // Second call is a no-op
        host.shutdown();
        let shutdowns = telemetry
            .snapshot()
            .events()
            .into_iter()
            .filter(|event| *event == LifecycleEvent::HostShutdown)
            .count();
        assert_eq!(shutdowns, 1);
    }

    #[test]
    fn panicking_task_does_not_stop_the_loop() {
        let (host, _) = test_host(true);
        host.run_on_host_thread(Box::new(|| panic!("task failure")))
            .unwrap();
        assert!(host.flush().is_ok());
    }
}
