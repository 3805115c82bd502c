//! Engine configuration structures.

use serde::{Deserialize, Serialize};

/// Default idle window before the worker exits, in milliseconds.
const DEFAULT_IDLE_TIMEOUT_MS: u64 = 5_000;
/// Default worker thread name.
const DEFAULT_WORKER_THREAD_NAME: &str = "anticipator-worker";
/// Default worker stack size in bytes.
const DEFAULT_WORKER_STACK_SIZE: usize = 1024 * 1024;
/// Default bound for in-memory diagnostic sinks built from this config.
const DEFAULT_DIAGNOSTIC_BUFFER: usize = 256;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Idle window before the worker exits, in milliseconds.
    pub idle_timeout_ms: u64,
    /// Name for the worker thread.
    pub worker_thread_name: String,
    /// Stack size for the worker thread, in bytes.
    pub worker_stack_size: usize,
    /// Event bound for in-memory diagnostic sinks built from this config.
    pub diagnostic_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            worker_thread_name: DEFAULT_WORKER_THREAD_NAME.to_owned(),
            worker_stack_size: DEFAULT_WORKER_STACK_SIZE,
            diagnostic_buffer: DEFAULT_DIAGNOSTIC_BUFFER,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the idle window before the worker exits.
    #[must_use]
    pub fn with_idle_timeout_ms(mut self, idle_timeout_ms: u64) -> Self {
        self.idle_timeout_ms = idle_timeout_ms;
        self
    }

    /// Set the worker thread name.
    #[must_use]
    pub fn with_worker_thread_name(mut self, name: impl Into<String>) -> Self {
        self.worker_thread_name = name.into();
        self
    }

    /// Set the worker thread stack size.
    #[must_use]
    pub fn with_worker_stack_size(mut self, bytes: usize) -> Self {
        self.worker_stack_size = bytes;
        self
    }

    /// Set the event bound for in-memory diagnostic sinks.
    #[must_use]
    pub fn with_diagnostic_buffer(mut self, max_events: usize) -> Self {
        self.diagnostic_buffer = max_events;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.idle_timeout_ms == 0 {
            return Err("idle_timeout_ms must be greater than 0".into());
        }
        if self.worker_thread_name.is_empty() {
            return Err("worker_thread_name must not be empty".into());
        }
        if self.worker_stack_size < 64 * 1024 {
            return Err("worker_stack_size must be at least 64 KiB".into());
        }
        if self.diagnostic_buffer == 0 {
            return Err("diagnostic_buffer must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse an engine configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation failure description.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
