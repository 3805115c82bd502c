//! Error types for engine operations.

use thiserror::Error;

/// Errors produced by engine components.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The scheduler worker has stopped; no further actions are accepted.
    #[error("scheduler stopped: {0}")]
    SchedulerStopped(String),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(String),
    /// A stored value failed to release cleanly at disposal.
    #[error("reclaim failed for key `{key}`: {source}")]
    ReclaimFailed {
        /// Diagnostic rendering of the offending key.
        key: String,
        /// Underlying release failure.
        #[source]
        source: anyhow::Error,
    },
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
