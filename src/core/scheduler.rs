//! Single-worker FIFO scheduler for anticipated actions.
//!
//! One dedicated OS thread executes scheduled actions strictly in submission
//! order. The worker blocks on its queue with an idle timeout: when no work
//! arrives for a full idle window, the loop exits and the scheduler becomes
//! terminal. Joining drops the queue sender first, so the worker exits as
//! soon as the queue drains instead of waiting out the idle window.
//!
//! # Design Principles
//!
//! - **No polling**: the worker blocks on channel recv with a timeout
//! - **FIFO**: a single consumer preserves submission order end to end
//! - **Contained failures**: a panicking action is caught and logged; the
//!   loop and all later actions are unaffected

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::config::EngineConfig;

use super::error::EngineError;

/// A queued zero-argument action, consumed exactly once by the worker.
type Action = Box<dyn FnOnce() + Send + 'static>;

/// Statistics about scheduler activity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerStats {
    /// Actions accepted by [`Scheduler::schedule`].
    pub scheduled_actions: u64,
    /// Actions the worker ran to completion.
    pub executed_actions: u64,
    /// Actions that panicked on the worker.
    pub panicked_actions: u64,
}

/// Internal counters for scheduler statistics (lock-free atomics).
#[derive(Debug, Default)]
struct SchedulerCounters {
    scheduled: AtomicU64,
    executed: AtomicU64,
    panicked: AtomicU64,
}

/// The single background worker and its FIFO action queue.
///
/// `schedule` never blocks; `join` is the only blocking wait and happens
/// once, at engine shutdown. Once the worker has stopped (idle timeout or
/// join), further `schedule` calls are rejected with a logged warning.
pub struct Scheduler {
    /// Action sender. `None` after `join` has initiated shutdown.
    tx: Mutex<Option<Sender<Action>>>,
    /// Worker thread handle. Taken by the first `join`.
    worker: Mutex<Option<JoinHandle<()>>>,
    /// Activity counters.
    counters: Arc<SchedulerCounters>,
}

impl Scheduler {
    /// Start the worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::WorkerSpawn`] if the OS refuses the thread.
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let (tx, rx) = unbounded::<Action>();
        let counters = Arc::new(SchedulerCounters::default());
        let idle_timeout = Duration::from_millis(config.idle_timeout_ms);

        let worker_counters = Arc::clone(&counters);
        let worker = thread::Builder::new()
            .name(config.worker_thread_name.clone())
            .stack_size(config.worker_stack_size)
            .spawn(move || worker_loop(&rx, idle_timeout, &worker_counters))
            .map_err(|e| EngineError::WorkerSpawn(e.to_string()))?;

        debug!(
            idle_timeout = ?idle_timeout,
            thread = %config.worker_thread_name,
            "scheduler worker started"
        );

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            counters,
        })
    }

    /// Enqueue an action and return immediately.
    ///
    /// Concurrent callers are safe; each caller's own submissions retain
    /// their relative FIFO order on the worker.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SchedulerStopped`] if the worker has already
    /// exited (idle timeout) or `join` has been initiated.
    pub fn schedule(&self, action: impl FnOnce() + Send + 'static) -> Result<(), EngineError> {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            warn!("schedule rejected: scheduler already joined");
            return Err(EngineError::SchedulerStopped("already joined".into()));
        };
        if tx.send(Box::new(action)).is_err() {
            warn!("schedule rejected: worker exited on idle timeout");
            return Err(EngineError::SchedulerStopped("worker idled out".into()));
        }
        self.counters.scheduled.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Block until the worker has drained its queue and exited.
    ///
    /// Drops the sender first so the worker exits as soon as the remaining
    /// queue is empty. Idempotent: later calls return immediately.
    pub fn join(&self) {
        {
            let mut tx = self.tx.lock();
            *tx = None;
        }

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("scheduler worker panicked");
            } else {
                debug!("scheduler worker joined");
            }
        }
    }

    /// Snapshot of scheduler activity.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            scheduled_actions: self.counters.scheduled.load(Ordering::Relaxed),
            executed_actions: self.counters.executed.load(Ordering::Relaxed),
            panicked_actions: self.counters.panicked.load(Ordering::Relaxed),
        }
    }
}

/// Worker loop: wait with an idle timeout, drain completely, wait again.
fn worker_loop(rx: &Receiver<Action>, idle_timeout: Duration, counters: &SchedulerCounters) {
    loop {
        match rx.recv_timeout(idle_timeout) {
            Ok(action) => {
                run_action(action, counters);
                // Drain everything queued behind this action before waiting.
                while let Ok(next) = rx.try_recv() {
                    run_action(next, counters);
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                debug!(idle_timeout = ?idle_timeout, "no work within idle window, worker exiting");
                break;
            }
            Err(RecvTimeoutError::Disconnected) => {
                debug!("scheduler channel closed, worker exiting");
                break;
            }
        }
    }
}

/// Run one action, containing any panic so the loop survives.
fn run_action(action: Action, counters: &SchedulerCounters) {
    if catch_unwind(AssertUnwindSafe(action)).is_ok() {
        counters.executed.fetch_add(1, Ordering::Relaxed);
    } else {
        counters.panicked.fetch_add(1, Ordering::Relaxed);
        error!("scheduled action panicked, worker continues");
    }
}
