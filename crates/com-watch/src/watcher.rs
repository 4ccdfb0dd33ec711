//! Port watcher engine
//!
//! [`PortWatcher`] runs one polling thread. Each tick enumerates the ports,
//! diffs the result against the previous snapshot and delivers the resulting
//! [`ChangeEvent`]s to subscribers on the polling thread.
//!
//! The thread sleeps between ticks on a wake channel, so a stop request
//! interrupts the sleep instead of waiting for the poll interval to elapse.
//! Stopping is two steps, [`PortWatcher::request_stop`] followed by
//! [`PortWatcher::await_exit`], which [`PortWatcher::stop`] composes.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use com_detect::{DeviceEnumerator, DeviceSnapshot};
use tracing::{debug, error, info, warn};

use crate::error::{HandlerError, WatchError};
use crate::events::ChangeEvent;
use crate::state::LifecycleState;

/// Poll period used when the caller has no preference
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How long dropping a running watcher waits for its thread
const DROP_STOP_TIMEOUT: Duration = Duration::from_secs(1);

type Handler = Arc<dyn Fn(&ChangeEvent) -> Result<(), HandlerError> + Send + Sync>;
type FailureHook = Arc<dyn Fn(&WatchError) + Send + Sync>;

/// Handle returned by [`PortWatcher::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Watcher configuration
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Name given to the polling thread
    pub thread_name: String,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            thread_name: "port-watcher".to_string(),
        }
    }
}

/// The running polling thread and its channels
struct Worker {
    /// Wakes the thread out of its inter-tick sleep
    wake_tx: Sender<()>,
    /// Receives the loop outcome right before the thread returns
    exit_rx: Receiver<Result<(), WatchError>>,
    handle: JoinHandle<()>,
}

impl Worker {
    fn is_current_thread(&self) -> bool {
        self.handle.thread().id() == thread::current().id()
    }

    fn join(self) {
        if self.handle.join().is_err() {
            warn!("Port watcher thread panicked during shutdown");
        }
    }
}

struct Control {
    state: LifecycleState,
    worker: Option<Worker>,
}

/// State shared between the watcher handle and its polling thread
struct Shared {
    enumerator: Box<dyn DeviceEnumerator>,
    control: Mutex<Control>,
    snapshot: RwLock<Arc<DeviceSnapshot>>,
    subscribers: Mutex<Vec<(SubscriptionId, Handler)>>,
    next_subscription: AtomicU64,
    failure_hook: Mutex<Option<FailureHook>>,
}

/// Background serial port change detector
///
/// Construct one per application and share it (e.g. behind an `Arc`);
/// a watcher never runs more than one polling thread.
pub struct PortWatcher {
    config: WatcherConfig,
    shared: Arc<Shared>,
}

impl PortWatcher {
    /// Create a stopped watcher with default configuration
    pub fn new(enumerator: impl DeviceEnumerator + 'static) -> Self {
        Self::with_config(enumerator, WatcherConfig::default())
    }

    /// Create a stopped watcher with custom configuration
    pub fn with_config(enumerator: impl DeviceEnumerator + 'static, config: WatcherConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                enumerator: Box::new(enumerator),
                control: Mutex::new(Control {
                    state: LifecycleState::Stopped,
                    worker: None,
                }),
                snapshot: RwLock::new(Arc::new(DeviceSnapshot::new())),
                subscribers: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(1),
                failure_hook: Mutex::new(None),
            }),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        lock(&self.shared.control).state
    }

    /// Most recently observed snapshot
    pub fn current_snapshot(&self) -> Arc<DeviceSnapshot> {
        let guard = self
            .shared
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Register a handler for change events
    ///
    /// Handlers run on the polling thread in registration order. A handler
    /// that fails or panics is logged and skipped; the others still run.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&ChangeEvent) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.shared.next_subscription.fetch_add(1, Ordering::Relaxed));
        lock(&self.shared.subscribers).push((id, Arc::new(handler)));
        debug!("Subscriber {:?} registered", id);
        id
    }

    /// Remove a handler. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = lock(&self.shared.subscribers);
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Install a hook called if the polling loop dies unexpectedly
    pub fn on_failure<F>(&self, hook: F)
    where
        F: Fn(&WatchError) + Send + Sync + 'static,
    {
        *lock(&self.shared.failure_hook) = Some(Arc::new(hook));
    }

    /// Start polling every `poll_interval`
    ///
    /// Does nothing if already running. The current ports are enumerated
    /// once before the thread starts so that they are not reported as added;
    /// if that enumeration fails or panics, the first successful tick becomes
    /// the baseline instead. May be called from the failure hook.
    pub fn start(&self, poll_interval: Duration) -> Result<(), WatchError> {
        let mut control = lock(&self.shared.control);
        match control.state {
            LifecycleState::Running => {
                debug!("Port watcher already running");
                return Ok(());
            }
            LifecycleState::StopRequested => return Err(WatchError::StopPending),
            LifecycleState::Stopped => {}
        }

        // A previous loop that stopped itself has already returned, unless
        // this is its failure hook restarting the watcher
        if let Some(finished) = control.worker.take() {
            if !finished.is_current_thread() {
                finished.join();
            }
        }

        let seed = panic::catch_unwind(AssertUnwindSafe(|| self.shared.enumerator.enumerate()));
        let baseline = match seed {
            Ok(Ok(snapshot)) => {
                let snapshot = Arc::new(snapshot);
                self.shared.publish(Arc::clone(&snapshot));
                Some(snapshot)
            }
            Ok(Err(e)) => {
                warn!("Initial port enumeration failed, deferring baseline: {}", e);
                None
            }
            Err(payload) => {
                warn!(
                    "Initial port enumeration panicked, deferring baseline: {}",
                    panic_message(&*payload)
                );
                None
            }
        };

        let (wake_tx, wake_rx) = mpsc::channel();
        let (exit_tx, exit_rx) = mpsc::channel();
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || shared.run(baseline, poll_interval, wake_rx, exit_tx))
            .map_err(WatchError::Spawn)?;

        control.worker = Some(Worker {
            wake_tx,
            exit_rx,
            handle,
        });
        control.state = LifecycleState::Running;
        info!("Port watcher started (poll interval {:?})", poll_interval);
        Ok(())
    }

    /// Signal the polling thread to exit and wake it immediately
    ///
    /// Returns false if the watcher was not running.
    pub fn request_stop(&self) -> bool {
        let mut control = lock(&self.shared.control);
        if control.state != LifecycleState::Running {
            return false;
        }
        control.state = LifecycleState::StopRequested;
        if let Some(worker) = &control.worker {
            // The thread may already be gone after a loop failure
            let _ = worker.wake_tx.send(());
        }
        info!("Port watcher stop requested");
        true
    }

    /// Wait up to `timeout` for the polling thread to exit
    ///
    /// Called from the polling thread itself (inside a subscriber) this
    /// returns immediately; the thread exits once the current tick is done.
    pub fn await_exit(&self, timeout: Duration) -> Result<(), WatchError> {
        let worker = {
            let mut control = lock(&self.shared.control);
            match &control.worker {
                None => return Ok(()),
                Some(worker) if worker.is_current_thread() => return Ok(()),
                Some(_) => {}
            }
            control.worker.take()
        };
        let Some(worker) = worker else {
            return Ok(());
        };

        match worker.exit_rx.recv_timeout(timeout) {
            Ok(_) | Err(RecvTimeoutError::Disconnected) => {
                worker.join();
                let mut control = lock(&self.shared.control);
                if control.worker.is_none() {
                    control.state = LifecycleState::Stopped;
                }
                info!("Port watcher stopped");
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                let mut control = lock(&self.shared.control);
                if control.worker.is_none() {
                    control.worker = Some(worker);
                }
                Err(WatchError::ShutdownTimeout { timeout })
            }
        }
    }

    /// Stop polling, waiting up to `timeout` for the thread to exit
    ///
    /// Does nothing if already stopped. On [`WatchError::ShutdownTimeout`]
    /// the watcher stays in `StopRequested`; calling `stop` again keeps
    /// waiting for the same thread.
    pub fn stop(&self, timeout: Duration) -> Result<(), WatchError> {
        self.request_stop();
        self.await_exit(timeout)
    }
}

impl Drop for PortWatcher {
    fn drop(&mut self) {
        if !self.state().is_active() {
            return;
        }
        if let Err(e) = self.stop(DROP_STOP_TIMEOUT) {
            warn!("Port watcher dropped while running: {}", e);
        }
    }
}

impl Shared {
    /// Body of the polling thread
    fn run(
        &self,
        baseline: Option<Arc<DeviceSnapshot>>,
        poll_interval: Duration,
        wake_rx: Receiver<()>,
        exit_tx: Sender<Result<(), WatchError>>,
    ) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.poll_loop(baseline, poll_interval, &wake_rx)
        }));

        let result = outcome.map_err(|payload| WatchError::LoopFailed(panic_message(&*payload)));

        // Stopped before the hook runs so the hook may restart the watcher
        lock(&self.control).state = LifecycleState::Stopped;

        if let Err(e) = &result {
            error!("{}", e);
            let hook = lock(&self.failure_hook).clone();
            if let Some(hook) = hook {
                hook(e);
            }
        }

        let _ = exit_tx.send(result);
    }

    fn poll_loop(
        &self,
        mut previous: Option<Arc<DeviceSnapshot>>,
        poll_interval: Duration,
        wake_rx: &Receiver<()>,
    ) {
        loop {
            self.tick(&mut previous);

            match wake_rx.recv_timeout(poll_interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("Port watcher loop exiting");
    }

    /// Enumerate, diff against `previous` and deliver the changes
    fn tick(&self, previous: &mut Option<Arc<DeviceSnapshot>>) {
        let devices = match self.enumerator.enumerate() {
            Ok(devices) => Arc::new(devices),
            Err(e) => {
                warn!("Port enumeration failed, skipping tick: {}", e);
                return;
            }
        };

        let events = match previous.as_deref() {
            Some(last) => ChangeEvent::from_diff(devices.diff(last)),
            None => {
                info!("Port baseline established with {} port(s)", devices.len());
                Vec::new()
            }
        };

        self.publish(Arc::clone(&devices));
        *previous = Some(devices);

        if !events.is_empty() {
            self.deliver(&events);
        }
    }

    fn publish(&self, snapshot: Arc<DeviceSnapshot>) {
        *self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// Deliver one tick's events to a stable copy of the subscriber list
    fn deliver(&self, events: &[ChangeEvent]) {
        let subscribers = lock(&self.subscribers).clone();

        for event in events {
            debug!("Port change: {:?}", event);
            for (id, handler) in &subscribers {
                match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!("Subscriber {:?} failed: {}", id, e),
                    Err(payload) => {
                        warn!("Subscriber {:?} panicked: {}", id, panic_message(&*payload))
                    }
                }
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use com_sim::ScriptedEnumerator;
    use std::time::Instant;

    const TICK: Duration = Duration::from_millis(5);
    const WAIT: Duration = Duration::from_secs(5);

    fn recorder(watcher: &PortWatcher) -> Arc<Mutex<Vec<ChangeEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        watcher.subscribe(move |event: &ChangeEvent| {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        });
        events
    }

    #[test]
    fn test_start_stop_transitions() {
        let watcher = PortWatcher::new(ScriptedEnumerator::new().then_ports(["COM1"]));
        assert_eq!(watcher.state(), LifecycleState::Stopped);

        watcher.start(TICK).unwrap();
        assert_eq!(watcher.state(), LifecycleState::Running);

        watcher.stop(WAIT).unwrap();
        assert_eq!(watcher.state(), LifecycleState::Stopped);

        // Stopping twice is a no-op, restarting works
        watcher.stop(WAIT).unwrap();
        watcher.start(TICK).unwrap();
        assert_eq!(watcher.state(), LifecycleState::Running);
        watcher.stop(WAIT).unwrap();
    }

    #[test]
    fn test_request_stop_only_when_running() {
        let watcher = PortWatcher::new(ScriptedEnumerator::new());
        assert!(!watcher.request_stop());

        watcher.start(Duration::from_secs(3600)).unwrap();
        assert!(watcher.request_stop());
        assert!(!watcher.request_stop());
        watcher.await_exit(WAIT).unwrap();
        assert_eq!(watcher.state(), LifecycleState::Stopped);
    }

    #[test]
    fn test_seed_populates_snapshot() {
        let watcher = PortWatcher::new(ScriptedEnumerator::new().then_ports(["COM1", "COM2"]));
        assert!(watcher.current_snapshot().is_empty());

        watcher.start(Duration::from_secs(3600)).unwrap();
        let snapshot = watcher.current_snapshot();
        assert!(snapshot.contains("COM1"));
        assert!(snapshot.contains("COM2"));
        watcher.stop(WAIT).unwrap();
    }

    #[test]
    fn test_failed_seed_defers_baseline() {
        let enumerator = ScriptedEnumerator::new()
            .then_fail("device manager unavailable")
            .then_ports(["COM1", "COM2"]);
        let watcher = PortWatcher::new(enumerator.clone());
        let events = recorder(&watcher);

        watcher.start(TICK).unwrap();
        assert!(enumerator.wait_for_calls(4, WAIT));
        watcher.stop(WAIT).unwrap();

        assert!(events.lock().unwrap().is_empty());
        assert_eq!(watcher.current_snapshot().len(), 2);
    }

    #[test]
    fn test_panicking_seed_defers_baseline() {
        let enumerator = ScriptedEnumerator::new()
            .then_panic("driver not loaded")
            .then_ports(["COM1"]);
        let watcher = PortWatcher::new(enumerator.clone());
        let events = recorder(&watcher);

        watcher.start(TICK).unwrap();
        assert_eq!(watcher.state(), LifecycleState::Running);
        assert!(enumerator.wait_for_calls(3, WAIT));
        watcher.stop(WAIT).unwrap();

        assert!(events.lock().unwrap().is_empty());
        assert!(watcher.current_snapshot().contains("COM1"));
        assert!(!watcher.shared.control.is_poisoned());
    }

    #[test]
    fn test_unsubscribe() {
        let watcher = PortWatcher::new(ScriptedEnumerator::new());
        let id = watcher.subscribe(|_: &ChangeEvent| Ok(()));

        assert!(watcher.unsubscribe(id));
        assert!(!watcher.unsubscribe(id));
    }

    #[test]
    fn test_drop_stops_thread() {
        let enumerator = ScriptedEnumerator::new().then_ports(["COM1"]);
        let watcher = PortWatcher::new(enumerator.clone());
        watcher.start(TICK).unwrap();
        assert!(enumerator.wait_for_calls(2, WAIT));

        let started = Instant::now();
        drop(watcher);
        assert!(started.elapsed() < DROP_STOP_TIMEOUT);

        let calls = enumerator.calls();
        thread::sleep(TICK * 10);
        assert_eq!(enumerator.calls(), calls);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");

        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(&*payload), "unknown panic");
    }
}
