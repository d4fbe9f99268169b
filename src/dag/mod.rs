// src/dag/mod.rs

//! DAG representation and scheduling.
//!
//! - [`graph`] holds the directed acyclic graph of tasks.
//! - [`task`] defines tasks, their per-run states and scheduled tasks.
//! - [`trigger_rule`] decides whether a task runs given upstream outcomes.
//! - [`scheduler`] contains the per-run state machine that resolves ready
//!   tasks and detects the end of a run.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`report`] summarises a finished run.

pub mod graph;
pub mod report;
pub mod scheduler;
pub mod scheduler_step;
pub mod task;
pub mod trigger_rule;

pub use graph::DagGraph;
pub use report::RunReport;
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task::{Outcome, ScheduledTask, Task, TaskState};
pub use trigger_rule::{TriggerDecision, evaluate};

/// Upstream list for tasks without dependencies.
pub const NO_UPSTREAM: [&str; 0] = [];
