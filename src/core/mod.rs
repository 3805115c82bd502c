//! Core engine machinery: tasks, scheduler, stores, engine, diagnostics.

pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod memo;
pub mod pool;
pub mod scheduler;
pub mod task;

pub use diagnostics::{
    DiagnosticAction, DiagnosticEvent, DiagnosticSink, EngineStats, InMemoryDiagnosticSink,
};
pub use engine::Anticipator;
pub use error::{AppResult, EngineError};
pub use memo::MemoStore;
pub use pool::PoolStore;
pub use scheduler::{Scheduler, SchedulerStats};
pub use task::{BuildTask, ComputeTask, Reclaim, TaskKey};
