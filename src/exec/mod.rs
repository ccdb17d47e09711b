// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`executor_loop`] owns the loop that spawns one Tokio task per
//!   scheduled task and cancels in-flight work on shutdown.
//! - [`task_runner`] runs a single task's work and reports its outcome.
//! - [`backend`] provides the `ExecutorBackend` trait and the
//!   `RealExecutorBackend` used in production; tests replace it with a fake.

pub mod backend;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;
