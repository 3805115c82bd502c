//! # Anticipator
//!
//! An anticipatory precomputation engine for hiding startup latency.
//!
//! This library speculatively executes expensive operations on a dedicated
//! background worker ahead of when a caller actually needs their results,
//! then serves those results synchronously. If the background work has not
//! finished (or was never scheduled), the fetch falls back to inline
//! execution on the calling thread. Anticipation is always a best-effort
//! optimization, never a different outcome.
//!
//! ## Core Problem Solved
//!
//! Startup paths are full of work whose cost is known in advance:
//!
//! - **Capability probes**: runtime versions, feature detection
//! - **One-time initialization**: class/table/registry warm-up
//! - **Object construction**: widgets and handles that are expensive to
//!   build but cheap to hand over
//!
//! Kicking that work off as early as possible and "collecting" it later
//! turns serial startup cost into background cost.
//!
//! ## Key Features
//!
//! - **Two store disciplines**: a memoizing single-value cache for
//!   idempotent, shareable results, and a consume-one pool for fresh
//!   single-use instances
//! - **Single-worker FIFO scheduler**: anticipated tasks run serially on
//!   one dedicated OS thread, in submission order
//! - **Never blocks on the worker**: a fetch either returns a precomputed
//!   value or executes inline; there is no wait-for-completion primitive
//! - **Race-free shutdown**: joining the worker first guarantees the
//!   disposal walk never races a background store
//! - **Structured diagnostics**: hit/miss/stored/unused events with an
//!   attachable sink, plus a CPU-utilization delta at shutdown
//!
//! ## Example
//!
//! ```rust,ignore
//! use anticipator::core::{Anticipator, ComputeTask, BuildTask};
//! use anticipator::config::EngineConfig;
//!
//! let engine: Anticipator<Probe, Widget> =
//!     Anticipator::new(EngineConfig::new())?;
//!
//! // Schedule speculative work as early as possible.
//! engine.anticipate_value(Probe::SdkVersion);
//! engine.anticipate_allocation(Widget::Toolbar);
//!
//! // Later: served from the store, or computed inline on a miss.
//! let version = engine.compute(&Probe::SdkVersion)?;
//! let toolbar = engine.allocate(&Widget::Toolbar)?;
//!
//! // At session end: drain the worker, reclaim unused work, log CPU delta.
//! engine.shutdown()?;
//! ```
//!
//! For complete examples, see `tests/anticipator_test.rs`.

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core engine machinery: tasks, scheduler, stores, engine, diagnostics.
pub mod core;
/// Configuration models for the engine and its worker.
pub mod config;
/// Builders to construct an engine from configuration.
pub mod builders;
/// Shared utilities: clock, CPU sampling, telemetry.
pub mod util;
