// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task::ScheduledTask;
use crate::engine::TaskName;

/// Structured result of a single scheduler "step".
///
/// Tests can drive the scheduler by hand and assert on what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks whose trigger rule said `Run`; the executor should start them.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Tasks resolved to `Skipped` in this step.
    pub newly_skipped: Vec<TaskName>,
    /// Tasks resolved to `UpstreamFailed` in this step.
    pub newly_upstream_failed: Vec<TaskName>,
    /// Whether this step caused the current run to finish.
    pub run_just_finished: bool,
}

impl SchedulerStep {
    pub fn scheduled_names(&self) -> Vec<&str> {
        self.newly_scheduled.iter().map(|t| t.name.as_str()).collect()
    }
}
