//! Builders to construct an anticipation engine from configuration.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::EngineConfig;
use crate::core::{
    Anticipator, BuildTask, ComputeTask, DiagnosticSink, EngineError, InMemoryDiagnosticSink,
};

/// Build an engine from configuration with an optional diagnostic sink.
///
/// # Errors
///
/// Returns [`EngineError::InvalidConfig`] for a bad configuration or
/// [`EngineError::WorkerSpawn`] if the worker thread cannot start.
pub fn build_engine<C, B>(
    cfg: &EngineConfig,
    sink: Option<Box<dyn DiagnosticSink>>,
) -> Result<Anticipator<C, B>, EngineError>
where
    C: ComputeTask,
    B: BuildTask,
{
    Anticipator::with_sink(cfg.clone(), sink)
}

/// Build an engine wired to a bounded in-memory sink sized from the
/// configuration's `diagnostic_buffer`, returning both.
///
/// The caller keeps the shared handle to inspect recorded events; the
/// engine records through the boxed end.
///
/// # Errors
///
/// Same conditions as [`build_engine`].
pub fn build_engine_with_memory_sink<C, B>(
    cfg: &EngineConfig,
) -> Result<(Anticipator<C, B>, Arc<Mutex<InMemoryDiagnosticSink>>), EngineError>
where
    C: ComputeTask,
    B: BuildTask,
{
    let sink = Arc::new(Mutex::new(InMemoryDiagnosticSink::new(cfg.diagnostic_buffer)));
    let engine = Anticipator::with_sink(cfg.clone(), Some(Box::new(Arc::clone(&sink))))?;
    Ok((engine, sink))
}
