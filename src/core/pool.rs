//! Multi-instance store with consume-one reads (allocation discipline).
//!
//! Each key shelves an unordered collection of interchangeable instances.
//! Anticipation appends; every successful fetch removes exactly one. No
//! ordering is promised among same-keyed instances. A fetch miss builds
//! inline on the calling thread and shelves nothing. A miss is signalled
//! structurally, never by a sentinel value.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::diagnostics::{DiagnosticAction, Diagnostics};
use super::error::{AppResult, EngineError};
use super::scheduler::Scheduler;
use super::task::{BuildTask, Reclaim};

/// Multi-value-per-key store with destructive reads.
pub struct PoolStore<B: BuildTask> {
    /// Per-key shelves. The outer lock guards the map shape; each shelf has
    /// its own lock so concurrent takers compete briefly per key.
    shelves: RwLock<HashMap<B, Mutex<Vec<B::Built>>>>,
    scheduler: Arc<Scheduler>,
    diagnostics: Arc<Diagnostics>,
}

impl<B: BuildTask> PoolStore<B> {
    pub(crate) fn new(scheduler: Arc<Scheduler>, diagnostics: Arc<Diagnostics>) -> Self {
        Self {
            shelves: RwLock::new(HashMap::new()),
            scheduler,
            diagnostics,
        }
    }

    /// Fetch one instance for `task`.
    ///
    /// Consumes a shelved instance when one exists, otherwise builds inline
    /// on the calling thread. The inline result is returned but not shelved.
    ///
    /// # Errors
    ///
    /// Propagates the task's own failure when built inline.
    pub fn get(&self, task: &B) -> AppResult<B::Built> {
        if let Some(instance) = self.take(task) {
            self.diagnostics.counters.pool_hits.fetch_add(1, Ordering::Relaxed);
            self.diagnostics.emit(&task.to_string(), DiagnosticAction::Hit);
            Ok(instance)
        } else {
            self.diagnostics.counters.pool_misses.fetch_add(1, Ordering::Relaxed);
            self.diagnostics.emit(&task.to_string(), DiagnosticAction::Miss);
            task.build()
        }
    }

    /// Schedule `task` for background execution; the built instance is
    /// appended to the key's shelf.
    ///
    /// Fire and forget, like [`MemoStore::anticipate`]: failures degrade to
    /// a later inline build.
    ///
    /// [`MemoStore::anticipate`]: super::memo::MemoStore::anticipate
    pub fn anticipate(self: &Arc<Self>, task: B) {
        let store = Arc::clone(self);
        let outcome = self.scheduler.schedule(move || store.build_and_shelve(&task));
        if let Err(err) = outcome {
            debug!(error = %err, "allocation anticipation dropped");
        }
    }

    /// Remove one instance if the shelf has any.
    fn take(&self, task: &B) -> Option<B::Built> {
        let shelves = self.shelves.read();
        let shelf = shelves.get(task)?;
        let instance = shelf.lock().pop();
        instance
    }

    /// Append an instance, creating the shelf on first use.
    fn put(&self, task: &B, instance: B::Built) {
        {
            let shelves = self.shelves.read();
            if let Some(shelf) = shelves.get(task) {
                shelf.lock().push(instance);
                return;
            }
        }
        self.shelves
            .write()
            .entry(task.clone())
            .or_insert_with(|| Mutex::new(Vec::new()))
            .lock()
            .push(instance);
    }

    /// Worker-side body of an anticipation.
    fn build_and_shelve(&self, task: &B) {
        let started = Instant::now();
        match task.build() {
            Ok(instance) => {
                let elapsed_ms = started.elapsed().as_millis();
                self.put(task, instance);
                self.diagnostics.counters.instances_pooled.fetch_add(1, Ordering::Relaxed);
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

    /// Release every shelved instance and clear the store.
    ///
    /// Every remaining instance is by definition unused and is reported as
    /// such before release.
    ///
    /// # Errors
    ///
    /// Propagates the first reclaim failure; the remaining walk is aborted.
    pub(crate) fn dispose(&self) -> Result<(), EngineError> {
        let shelves: Vec<(B, Mutex<Vec<B::Built>>)> = self.shelves.write().drain().collect();

        for (task, shelf) in shelves {
            for instance in shelf.into_inner() {
                self.diagnostics.counters.unused_reclaimed.fetch_add(1, Ordering::Relaxed);
                self.diagnostics.emit(&task.to_string(), DiagnosticAction::Unused);
                instance.reclaim().map_err(|source| EngineError::ReclaimFailed {
                    key: task.to_string(),
                    source,
                })?;
            }
        }

        debug!("pool store disposed");
        Ok(())
    }
}
