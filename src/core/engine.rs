//! The anticipation engine: scheduler plus both store disciplines.
//!
//! One engine instance serves an entire process or session. Construction
//! starts the worker and samples a baseline CPU metric; shutdown joins the
//! worker, disposes both stores, and logs the CPU utilization delta as an
//! overall cost/benefit signal for the anticipation strategy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::util::cpu::CpuSample;

use super::diagnostics::{DiagnosticAction, DiagnosticSink, Diagnostics, EngineStats};
use super::error::{AppResult, EngineError};
use super::memo::MemoStore;
use super::pool::PoolStore;
use super::scheduler::Scheduler;
use super::task::{BuildTask, ComputeTask};

/// The anticipatory precomputation engine.
///
/// Exposes two independent precompute/fetch channels: value anticipation
/// over a memoizing store for `C` tasks, and allocation anticipation over a
/// consume-one pool for `B` tasks. All anticipated work runs serially on
/// one background worker; fetches never block on it.
///
/// Explicitly constructed and explicitly shut down; the owning session
/// object holds the engine for its whole lifetime.
pub struct Anticipator<C: ComputeTask, B: BuildTask> {
    scheduler: Arc<Scheduler>,
    memo: Arc<MemoStore<C>>,
    pool: Arc<PoolStore<B>>,
    diagnostics: Arc<Diagnostics>,
    cpu_start: Option<CpuSample>,
    shut_down: AtomicBool,
}

impl<C: ComputeTask, B: BuildTask> Anticipator<C, B> {
    /// Start an engine: validate the configuration, spawn the worker, and
    /// record the baseline CPU sample.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] for a bad configuration or
    /// [`EngineError::WorkerSpawn`] if the worker thread cannot start.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_sink(config, None)
    }

    /// Start an engine with an attached diagnostic sink.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Anticipator::new`].
    pub fn with_sink(
        config: EngineConfig,
        sink: Option<Box<dyn DiagnosticSink>>,
    ) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::InvalidConfig)?;

        let scheduler = Arc::new(Scheduler::new(&config)?);
        let diagnostics = Arc::new(Diagnostics::new(sink));
        let memo = Arc::new(MemoStore::new(
            Arc::clone(&scheduler),
            Arc::clone(&diagnostics),
        ));
        let pool = Arc::new(PoolStore::new(
            Arc::clone(&scheduler),
            Arc::clone(&diagnostics),
        ));
        let cpu_start = CpuSample::now();

        info!(
            idle_timeout_ms = config.idle_timeout_ms,
            worker = %config.worker_thread_name,
            "anticipator engine started"
        );

        Ok(Self {
            scheduler,
            memo,
            pool,
            diagnostics,
            cpu_start,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Schedule `task` for background execution; its result is memoized
    /// under the task's identity with first-write-wins semantics.
    pub fn anticipate_value(&self, task: C) {
        self.memo.anticipate(task);
    }

    /// Fetch the memoized value for `task`, computing inline on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the task's own failure when computed inline.
    pub fn compute(&self, task: &C) -> AppResult<C::Value> {
        self.memo.get(task)
    }

    /// Schedule `task` for background execution; the built instance joins
    /// the key's pool of interchangeable instances.
    pub fn anticipate_allocation(&self, task: B) {
        self.pool.anticipate(task);
    }

    /// Fetch one pooled instance for `task`, building inline on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the task's own failure when built inline.
    pub fn allocate(&self, task: &B) -> AppResult<B::Built> {
        self.pool.get(task)
    }

    /// Snapshot of engine activity.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.diagnostics.snapshot(self.scheduler.stats())
    }

    /// Shut down: join the worker, dispose both stores, log the CPU delta.
    ///
    /// Joining first guarantees the disposal walk never races a background
    /// store. Idempotent: later calls return `Ok(())` immediately.
    ///
    /// # Errors
    ///
    /// Propagates a [`EngineError::ReclaimFailed`] from either store; the
    /// disposal aborts at the first failing value.
    pub fn shutdown(&self) -> Result<(), EngineError> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        info!("shutting down anticipator engine");
        self.scheduler.join();
        self.memo.dispose()?;
        self.pool.dispose()?;

        if let (Some(start), Some(end)) = (self.cpu_start, CpuSample::now()) {
            if let Some(percent) = end.busy_percent_since(start) {
                self.diagnostics
                    .emit("engine", DiagnosticAction::CpuUtilization { percent });
            }
        }

        info!("anticipator engine shut down");
        Ok(())
    }
}

impl<C: ComputeTask, B: BuildTask> Drop for Anticipator<C, B> {
    fn drop(&mut self) {
        // No join here: dropping the scheduler drops the queue sender, so
        // the worker drains and exits detached.
        if !self.shut_down.swap(true, Ordering::AcqRel) {
            debug!("anticipator dropped without explicit shutdown, worker detached");
        }
    }
}
