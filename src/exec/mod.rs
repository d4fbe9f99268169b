// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`backend`] provides the `ExecutorBackend` trait and the bounded
//!   worker pool the runtime uses in production.
//! - [`task_runner`] runs a single scheduled task and reports completion.
//! - [`retry`] applies a task's retry policy around its operator.
//! - [`poll`] is the polling primitive sensors are built on.

pub mod backend;
pub mod poll;
pub mod retry;
pub mod task_runner;

pub use backend::{ExecutorBackend, PoolExecutorBackend};
pub use poll::{PollOutcome, PollReport, Poller};
pub use retry::{Attempted, RetryPolicy, run_with_retry, run_with_retry_in_pool};
