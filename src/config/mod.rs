//! Configuration models for the engine and its worker.

pub mod engine;

pub use engine::EngineConfig;
