// src/engine/mod.rs

//! Orchestration engine for polldag.
//!
//! This module ties together:
//! - the DAG scheduler (pure per-run state machine)
//! - the executor backend that runs operators on a worker pool
//! - the runtime loop that feeds completions back into the scheduler
//! - the fixed-interval recurrence of whole runs
//!
//! The async shell around the scheduler lives in [`runtime`]; the cadence
//! loop in [`recurrence`].

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Result of executing a task's operator, after retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed,
}

/// Sent by the executor when a scheduled task reached a final result.
#[derive(Debug, Clone)]
pub struct TaskCompletion {
    pub task: TaskName,
    /// Run the task was scheduled in; completions from older runs are stale.
    pub run_id: u64,
    pub outcome: TaskOutcome,
    /// How many times the operator was invoked.
    pub attempts: u32,
}

pub mod recurrence;
pub mod runtime;

pub use recurrence::run_forever;
pub use runtime::Runtime;
