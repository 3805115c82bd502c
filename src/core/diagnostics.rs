//! Structured diagnostic events, sinks, and engine statistics.
//!
//! Every store operation emits a tagged event: hit/miss on fetch, stored
//! with elapsed millis on background completion, failed on task error,
//! unused at disposal, and a CPU-utilization delta at shutdown. Events are
//! always mirrored to `tracing`; an optional sink receives them as values
//! for tests and operational tooling. These are advisory side channels;
//! no functional contract depends on them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::util::clock::now_ms;

use super::scheduler::SchedulerStats;

/// What happened, as observed by a store or the engine lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticAction {
    /// A fetch was served from a store.
    Hit,
    /// A fetch found no stored value and ran the task inline.
    Miss,
    /// A background anticipation stored its result.
    Stored {
        /// Wall-clock execution time of the task on the worker.
        elapsed_ms: u128,
    },
    /// A background anticipation failed; nothing was stored.
    Failed {
        /// Rendered task error.
        error: String,
    },
    /// A stored entry was never consumed before disposal.
    Unused,
    /// Overall CPU utilization between engine start and shutdown.
    CpuUtilization {
        /// Busy percentage over the engine's lifetime.
        percent: u8,
    },
}

/// One diagnostic event.
#[derive(Debug, Clone)]
pub struct DiagnosticEvent {
    /// Event identifier.
    pub event_id: Uuid,
    /// Rendered task key (`Display` form), or `engine` for lifecycle events.
    pub key: String,
    /// What happened.
    pub action: DiagnosticAction,
    /// Timestamp milliseconds.
    pub at_ms: u128,
}

/// Diagnostic sink abstraction.
pub trait DiagnosticSink: Send {
    /// Record a diagnostic event.
    fn record(&mut self, event: DiagnosticEvent);
}

/// A shared sink handle records into the wrapped sink.
///
/// Lets a test hold on to an in-memory sink while the engine owns the boxed
/// recording end.
impl<S: DiagnosticSink> DiagnosticSink for std::sync::Arc<Mutex<S>> {
    fn record(&mut self, event: DiagnosticEvent) {
        self.lock().record(event);
    }
}

/// In-memory diagnostic sink for testing and dev.
pub struct InMemoryDiagnosticSink {
    events: VecDeque<DiagnosticEvent>,
    max_events: usize,
}

impl InMemoryDiagnosticSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.iter().cloned().collect()
    }
}

impl DiagnosticSink for InMemoryDiagnosticSink {
    fn record(&mut self, event: DiagnosticEvent) {
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Statistics about engine activity.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineStats {
    /// Actions accepted by the scheduler.
    pub scheduled_actions: u64,
    /// Actions the worker ran to completion.
    pub executed_actions: u64,
    /// Actions that panicked on the worker.
    pub panicked_actions: u64,
    /// Memo fetches served from the store.
    pub memo_hits: u64,
    /// Memo fetches that ran the task inline.
    pub memo_misses: u64,
    /// Pool fetches that consumed a stored instance.
    pub pool_hits: u64,
    /// Pool fetches that ran the task inline.
    pub pool_misses: u64,
    /// Values stored by background memo anticipations.
    pub values_stored: u64,
    /// Instances appended by background pool anticipations.
    pub instances_pooled: u64,
    /// Background task failures (nothing stored).
    pub task_failures: u64,
    /// Entries reclaimed unconsumed at disposal.
    pub unused_reclaimed: u64,
}

/// Internal counters for engine statistics (lock-free atomics).
#[derive(Debug, Default)]
pub(crate) struct EngineCounters {
    pub memo_hits: AtomicU64,
    pub memo_misses: AtomicU64,
    pub pool_hits: AtomicU64,
    pub pool_misses: AtomicU64,
    pub values_stored: AtomicU64,
    pub instances_pooled: AtomicU64,
    pub task_failures: AtomicU64,
    pub unused_reclaimed: AtomicU64,
}

/// Shared diagnostics channel: counters plus an optional event sink.
pub(crate) struct Diagnostics {
    pub counters: EngineCounters,
    sink: Mutex<Option<Box<dyn DiagnosticSink>>>,
}

impl Diagnostics {
    pub fn new(sink: Option<Box<dyn DiagnosticSink>>) -> Self {
        Self {
            counters: EngineCounters::default(),
            sink: Mutex::new(sink),
        }
    }

    /// Emit one event: trace it by severity, then hand it to the sink.
    pub fn emit(&self, key: &str, action: DiagnosticAction) {
        match &action {
            DiagnosticAction::Hit => debug!(key, "store hit"),
            DiagnosticAction::Miss => debug!(key, "store miss"),
            DiagnosticAction::Stored { elapsed_ms } => {
                debug!(key, elapsed_ms = *elapsed_ms as u64, "anticipated value stored");
            }
            DiagnosticAction::Failed { error: err } => {
                error!(key, error = %err, "anticipated task failed");
            }
            DiagnosticAction::Unused => info!(key, "stored entry never consumed"),
            DiagnosticAction::CpuUtilization { percent } => {
                info!(percent = *percent, "cpu utilization over engine lifetime");
            }
        }

        let mut sink = self.sink.lock();
        if let Some(sink) = sink.as_mut() {
            sink.record(DiagnosticEvent {
                event_id: Uuid::new_v4(),
                key: key.to_owned(),
                action,
                at_ms: now_ms(),
            });
        }
    }

    /// Merge store counters with scheduler counters into one snapshot.
    pub fn snapshot(&self, scheduler: SchedulerStats) -> EngineStats {
        EngineStats {
            scheduled_actions: scheduler.scheduled_actions,
            executed_actions: scheduler.executed_actions,
            panicked_actions: scheduler.panicked_actions,
            memo_hits: self.counters.memo_hits.load(Ordering::Relaxed),
            memo_misses: self.counters.memo_misses.load(Ordering::Relaxed),
            pool_hits: self.counters.pool_hits.load(Ordering::Relaxed),
            pool_misses: self.counters.pool_misses.load(Ordering::Relaxed),
            values_stored: self.counters.values_stored.load(Ordering::Relaxed),
            instances_pooled: self.counters.instances_pooled.load(Ordering::Relaxed),
            task_failures: self.counters.task_failures.load(Ordering::Relaxed),
            unused_reclaimed: self.counters.unused_reclaimed.load(Ordering::Relaxed),
        }
    }
}
