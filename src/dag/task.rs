// src/dag/task.rs

//! Task definitions and per-run task state.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::engine::TaskName;
use crate::exec::RetryPolicy;
use crate::operators::{Operator, TaskContext};
use crate::types::TriggerRule;

/// Terminal outcome of a task within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failed,
    Skipped,
    UpstreamFailed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Failed => write!(f, "failed"),
            Outcome::Skipped => write!(f, "skipped"),
            Outcome::UpstreamFailed => write!(f, "upstream_failed"),
        }
    }
}

/// Per-run state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
    UpstreamFailed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        self.outcome().is_some()
    }

    /// The terminal outcome, or `None` while `Pending`/`Running`.
    pub fn outcome(self) -> Option<Outcome> {
        match self {
            TaskState::Pending | TaskState::Running => None,
            TaskState::Success => Some(Outcome::Success),
            TaskState::Failed => Some(Outcome::Failed),
            TaskState::Skipped => Some(Outcome::Skipped),
            TaskState::UpstreamFailed => Some(Outcome::UpstreamFailed),
        }
    }
}

impl From<Outcome> for TaskState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success => TaskState::Success,
            Outcome::Failed => TaskState::Failed,
            Outcome::Skipped => TaskState::Skipped,
            Outcome::UpstreamFailed => TaskState::UpstreamFailed,
        }
    }
}

/// A node of the dependency graph: a named operator plus the policy that
/// governs when and how often it runs.
#[derive(Clone)]
pub struct Task {
    name: TaskName,
    operator: Arc<dyn Operator>,
    trigger_rule: TriggerRule,
    retry_policy: RetryPolicy,
}

impl Task {
    pub fn new(name: impl Into<TaskName>, operator: Arc<dyn Operator>) -> Self {
        Self {
            name: name.into(),
            operator,
            trigger_rule: TriggerRule::default(),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_trigger_rule(mut self, rule: TriggerRule) -> Self {
        self.trigger_rule = rule;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operator(&self) -> &Arc<dyn Operator> {
        &self.operator
    }

    pub fn trigger_rule(&self) -> TriggerRule {
        self.trigger_rule
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub(crate) fn set_trigger_rule(&mut self, rule: TriggerRule) {
        self.trigger_rule = rule;
    }

    pub(crate) fn set_retry_policy(&mut self, policy: RetryPolicy) {
        self.retry_policy = policy;
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("operator", &self.operator.kind())
            .field("trigger_rule", &self.trigger_rule)
            .field("retry_policy", &self.retry_policy)
            .finish()
    }
}

/// Description of a task that the scheduler wants the executor to run now.
#[derive(Clone)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub operator: Arc<dyn Operator>,
    pub retry_policy: RetryPolicy,
    /// Monotonically increasing DAG run identifier.
    pub run_id: u64,
    /// Logical time of the run, used to render file-name templates.
    pub logical_time: DateTime<Utc>,
}

impl ScheduledTask {
    pub fn from_task(task: &Task, run_id: u64, logical_time: DateTime<Utc>) -> Self {
        Self {
            name: task.name.clone(),
            operator: Arc::clone(&task.operator),
            retry_policy: task.retry_policy.clone(),
            run_id,
            logical_time,
        }
    }

    pub fn context(&self) -> TaskContext {
        TaskContext {
            task: self.name.clone(),
            run_id: self.run_id,
            logical_time: self.logical_time,
        }
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("name", &self.name)
            .field("operator", &self.operator.kind())
            .field("run_id", &self.run_id)
            .field("logical_time", &self.logical_time)
            .finish_non_exhaustive()
    }
}
