//! Memoizing single-value store (cache discipline).
//!
//! One slot per key, written at most once: the first successful background
//! write wins and is permanent for the engine's life. Reads are
//! non-destructive: every observer receives a clone of the stored value.
//! A fetch miss executes the task inline on the calling thread and stores
//! nothing; only anticipation populates the store.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::diagnostics::{DiagnosticAction, Diagnostics};
use super::error::{AppResult, EngineError};
use super::scheduler::Scheduler;
use super::task::{ComputeTask, Reclaim};

/// Single-value-per-key store with non-destructive reads.
pub struct MemoStore<C: ComputeTask> {
    /// Stored values. Write once per key, read many.
    entries: RwLock<HashMap<C, C::Value>>,
    /// Keys already observed by a fetch; gates hit/miss logging so hot keys
    /// do not flood the log, and marks entries as used for disposal.
    observed: Mutex<HashSet<C>>,
    scheduler: Arc<Scheduler>,
    diagnostics: Arc<Diagnostics>,
}

impl<C: ComputeTask> MemoStore<C> {
    pub(crate) fn new(scheduler: Arc<Scheduler>, diagnostics: Arc<Diagnostics>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            observed: Mutex::new(HashSet::new()),
            scheduler,
            diagnostics,
        }
    }

    /// Fetch the value for `task`.
    ///
    /// Served from the store when present, otherwise computed inline on the
    /// calling thread. The inline result is returned but not stored.
    ///
    /// # Errors
    ///
    /// Propagates the task's own failure when computed inline.
    pub fn get(&self, task: &C) -> AppResult<C::Value> {
        let stored = self.entries.read().get(task).cloned();
        let first_observation = self.observed.lock().insert(task.clone());

        if let Some(value) = stored {
            self.diagnostics.counters.memo_hits.fetch_add(1, Ordering::Relaxed);
            if first_observation {
                self.diagnostics.emit(&task.to_string(), DiagnosticAction::Hit);
            }
            Ok(value)
        } else {
            self.diagnostics.counters.memo_misses.fetch_add(1, Ordering::Relaxed);
            if first_observation {
                self.diagnostics.emit(&task.to_string(), DiagnosticAction::Miss);
            }
            task.compute()
        }
    }

    /// Schedule `task` for background execution and storage of its result.
    ///
    /// Fire and forget: a stopped scheduler or failing task degrades to a
    /// later inline fetch; nothing surfaces to this caller.
    pub fn anticipate(self: &Arc<Self>, task: C) {
        let store = Arc::clone(self);
        let outcome = self.scheduler.schedule(move || store.compute_and_store(&task));
        if let Err(err) = outcome {
            debug!(error = %err, "value anticipation dropped");
        }
    }

    /// Worker-side body of an anticipation.
    fn compute_and_store(&self, task: &C) {
        let started = Instant::now();
        match task.compute() {
            Ok(value) => {
                let elapsed_ms = started.elapsed().as_millis();
                // First write wins; a raced duplicate is dropped.
                self.entries.write().entry(task.clone()).or_insert(value);
                self.diagnostics.counters.values_stored.fetch_add(1, Ordering::Relaxed);
                self.diagnostics
                    .emit(&task.to_string(), DiagnosticAction::Stored { elapsed_ms });
            }
            Err(error) => {
                self.diagnostics.counters.task_failures.fetch_add(1, Ordering::Relaxed);
                self.diagnostics.emit(
                    &task.to_string(),
                    DiagnosticAction::Failed {
                        error: error.to_string(),
                    },
                );
            }
        }
    }

    /// Release every stored value and clear the store.
    ///
    /// Entries never observed by a fetch are reported as unused.
    ///
    /// # Errors
    ///
    /// Propagates the first reclaim failure; the remaining walk is aborted.
    pub(crate) fn dispose(&self) -> Result<(), EngineError> {
        let entries: Vec<(C, C::Value)> = self.entries.write().drain().collect();
        let observed = std::mem::take(&mut *self.observed.lock());

        for (task, value) in entries {
            if !observed.contains(&task) {
                self.diagnostics.counters.unused_reclaimed.fetch_add(1, Ordering::Relaxed);
                self.diagnostics.emit(&task.to_string(), DiagnosticAction::Unused);
            }
            value.reclaim().map_err(|source| EngineError::ReclaimFailed {
                key: task.to_string(),
                source,
            })?;
        }

        debug!("memo store disposed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use std::fmt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone)]
    struct Probe {
        name: &'static str,
        invocations: Arc<AtomicUsize>,
    }

    // Identity is the name alone; the counter is test instrumentation.
    impl PartialEq for Probe {
        fn eq(&self, other: &Self) -> bool {
            self.name == other.name
        }
    }

    impl Eq for Probe {}

    impl std::hash::Hash for Probe {
        fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
            self.name.hash(state);
        }
    }

    impl fmt::Display for Probe {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "probe={}", self.name)
        }
    }

    impl ComputeTask for Probe {
        type Value = u32;

        fn compute(&self) -> AppResult<u32> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            Ok(29)
        }
    }

    fn probe(name: &'static str) -> Probe {
        Probe {
            name,
            invocations: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn store() -> Arc<MemoStore<Probe>> {
        let config = EngineConfig::new().with_idle_timeout_ms(200);
        let scheduler = Arc::new(Scheduler::new(&config).unwrap());
        Arc::new(MemoStore::new(scheduler, Arc::new(Diagnostics::new(None))))
    }

    #[test]
    fn miss_computes_inline_and_stores_nothing() {
        let store = store();
        let task = probe("sdk-version");

        assert_eq!(store.get(&task).unwrap(), 29);
        assert_eq!(store.get(&task).unwrap(), 29);
        // Plain fetches never populate the store.
        assert_eq!(task.invocations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn anticipated_value_is_served_without_recompute() {
        let store = store();
        let task = probe("sdk-version");

        store.anticipate(task.clone());
        store.scheduler.join();

        assert_eq!(store.get(&task).unwrap(), 29);
        assert_eq!(store.get(&task).unwrap(), 29);
        assert_eq!(task.invocations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn first_write_wins() {
        let store = store();
        let task = probe("sdk-version");

        store.anticipate(task.clone());
        store.anticipate(task.clone());
        store.scheduler.join();

        // Both anticipations ran, only one value is held.
        assert_eq!(task.invocations.load(Ordering::SeqCst), 2);
        assert_eq!(store.entries.read().len(), 1);
        assert_eq!(store.get(&task).unwrap(), 29);
        assert_eq!(task.invocations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dispose_counts_unobserved_entries() {
        let diagnostics = Arc::new(Diagnostics::new(None));
        let config = EngineConfig::new().with_idle_timeout_ms(200);
        let scheduler = Arc::new(Scheduler::new(&config).unwrap());
        let store = Arc::new(MemoStore::new(scheduler, Arc::clone(&diagnostics)));

        let used = probe("used");
        let unused = probe("unused");
        store.anticipate(used.clone());
        store.anticipate(unused);
        store.scheduler.join();

        let _ = store.get(&used).unwrap();
        store.dispose().unwrap();

        assert_eq!(
            diagnostics
                .counters
                .unused_reclaimed
                .load(Ordering::Relaxed),
            1
        );
        assert!(store.entries.read().is_empty());
    }

    #[test]
    fn failed_anticipation_leaves_no_entry() {
        #[derive(Clone, PartialEq, Eq, Hash)]
        struct Failing;

        impl fmt::Display for Failing {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "failing")
            }
        }

        impl ComputeTask for Failing {
            type Value = u32;

            fn compute(&self) -> AppResult<u32> {
                anyhow::bail!("resource unavailable")
            }
        }

        let config = EngineConfig::new().with_idle_timeout_ms(200);
        let scheduler = Arc::new(Scheduler::new(&config).unwrap());
        let diagnostics = Arc::new(Diagnostics::new(None));
        let store = Arc::new(MemoStore::new(scheduler, Arc::clone(&diagnostics)));

        store.anticipate(Failing);
        store.scheduler.join();

        assert!(store.entries.read().is_empty());
        assert_eq!(diagnostics.counters.task_failures.load(Ordering::Relaxed), 1);
        // A later fetch falls through to inline execution, which fails again
        // and surfaces to this caller.
        assert!(store.get(&Failing).is_err());
    }
}
