use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::report::RunReport;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::task::{Outcome, ScheduledTask, TaskState};
use crate::dag::trigger_rule::{TriggerDecision, evaluate};
use crate::engine::{TaskName, TaskOutcome};
use crate::errors::{PolldagError, Result};

/// Scheduler holds the immutable DAG plus mutable per-run state.
///
/// It is responsible for:
/// - resetting every task to `Pending` when a run starts
/// - resolving ready tasks through their trigger rules
/// - recording completions reported by the executor
/// - detecting the end of a run, or a deadlock
///
/// The scheduler performs no IO; the runtime feeds it completions and
/// dispatches whatever it schedules.
#[derive(Debug)]
pub struct Scheduler {
    graph: Arc<DagGraph>,
    states: HashMap<TaskName, TaskState>,
    /// Monotonically increasing run ID.
    run_counter: u64,
    /// Currently active run ID, or `None` if there is no active run.
    current_run_id: Option<u64>,
    logical_time: DateTime<Utc>,
}

impl Scheduler {
    pub fn new(graph: Arc<DagGraph>) -> Self {
        Self {
            graph,
            states: HashMap::new(),
            run_counter: 0,
            current_run_id: None,
            logical_time: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    pub fn graph(&self) -> &Arc<DagGraph> {
        &self.graph
    }

    /// Returns `true` if there is currently no active run.
    pub fn is_idle(&self) -> bool {
        self.current_run_id.is_none()
    }

    /// Current run ID, if any.
    pub fn current_run_id(&self) -> Option<u64> {
        self.current_run_id
    }

    /// ID of the most recently started run (0 before the first run).
    pub fn last_run_id(&self) -> u64 {
        self.run_counter
    }

    /// State of `task` in the current (or last) run.
    pub fn state_of(&self, task: &str) -> Option<TaskState> {
        self.states.get(task).copied()
    }

    /// Start a new run: every task goes back to `Pending` and the roots are
    /// scheduled.
    pub fn start_new_run(&mut self, logical_time: DateTime<Utc>) -> Result<SchedulerStep> {
        if let Some(run_id) = self.current_run_id {
            warn!(run_id, "starting a new run while the previous one is unfinished");
        }

        self.run_counter += 1;
        self.current_run_id = Some(self.run_counter);
        self.logical_time = logical_time;
        self.states = self
            .graph
            .tasks()
            .map(|name| (name.to_string(), TaskState::Pending))
            .collect();

        debug!(run_id = self.run_counter, %logical_time, "scheduler: starting new DAG run");
        self.advance()
    }

    /// Record the outcome of a task the executor finished.
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> Result<SchedulerStep> {
        let Some(run_id) = self.current_run_id else {
            warn!(task = %task, "completion with no active run; ignoring");
            return Ok(SchedulerStep::default());
        };

        match self.states.get(task).copied() {
            Some(TaskState::Running) => {
                let next = match outcome {
                    TaskOutcome::Success => {
                        info!(task = %task, run_id, "task succeeded");
                        TaskState::Success
                    }
                    TaskOutcome::Failed => {
                        warn!(task = %task, run_id, "task failed");
                        TaskState::Failed
                    }
                };
                self.states.insert(task.to_string(), next);
            }
            Some(other) => {
                warn!(task = %task, run_id, state = ?other, "completion for task that is not running; ignoring");
                return Ok(SchedulerStep::default());
            }
            None => {
                warn!(task = %task, "completion for unknown task; ignoring");
                return Ok(SchedulerStep::default());
            }
        }

        self.advance()
    }

    /// Snapshot of the terminal outcomes of the current (or last) run.
    pub fn report(&self) -> RunReport {
        RunReport {
            run_id: self.run_counter,
            logical_time: self.logical_time,
            outcomes: self
                .states
                .iter()
                .filter_map(|(name, state)| state.outcome().map(|o| (name.clone(), o)))
                .collect(),
            leaves: self.graph.leaves().into_iter().map(str::to_string).collect(),
        }
    }

    /// Resolve ready tasks until nothing changes, then decide whether the
    /// run finished, is still in flight, or is stuck.
    fn advance(&mut self) -> Result<SchedulerStep> {
        let Some(run_id) = self.current_run_id else {
            return Ok(SchedulerStep::default());
        };

        let graph = Arc::clone(&self.graph);
        let mut step = SchedulerStep::default();

        // Skips and upstream failures are terminal, so they may unblock more
        // tasks within the same step.
        loop {
            let ready: Vec<TaskName> = graph
                .ready_tasks(&self.states)
                .map(str::to_string)
                .collect();
            if ready.is_empty() {
                break;
            }

            for name in ready {
                let Some(task) = graph.task(&name) else {
                    continue;
                };
                let upstream: Vec<Outcome> = graph
                    .dependencies_of(&name)
                    .into_iter()
                    .filter_map(|up| self.states.get(up).and_then(|s| s.outcome()))
                    .collect();

                let decision = evaluate(task.trigger_rule(), &upstream);
                debug!(
                    task = %name,
                    run_id,
                    rule = %task.trigger_rule(),
                    ?upstream,
                    ?decision,
                    "trigger rule evaluated"
                );

                match decision {
                    TriggerDecision::Run => {
                        info!(task = %name, run_id, "scheduling task");
                        self.states.insert(name.clone(), TaskState::Running);
                        step.newly_scheduled.push(ScheduledTask::from_task(
                            task,
                            run_id,
                            self.logical_time,
                        ));
                    }
                    TriggerDecision::Skip => {
                        info!(task = %name, run_id, "skipping task");
                        self.states.insert(name.clone(), TaskState::Skipped);
                        step.newly_skipped.push(name);
                    }
                    TriggerDecision::UpstreamFail => {
                        info!(task = %name, run_id, "upstream failed; not running task");
                        self.states.insert(name.clone(), TaskState::UpstreamFailed);
                        step.newly_upstream_failed.push(name);
                    }
                }
            }
        }

        check_progress(run_id, &self.states).inspect_err(|_| {
            // The run is abandoned; a new one starts from scratch.
            self.current_run_id = None;
        })?;

        if self.states.values().all(|s| s.is_terminal()) {
            info!(run_id, "scheduler: all tasks terminal; marking run as finished");
            self.current_run_id = None;
            step.run_just_finished = true;
        }

        Ok(step)
    }
}

/// Fails with [`PolldagError::Deadlock`] when no task is running and some
/// task is still not terminal after ready tasks were resolved.
fn check_progress(run_id: u64, states: &HashMap<TaskName, TaskState>) -> Result<()> {
    let running = states.values().any(|s| *s == TaskState::Running);
    if running {
        return Ok(());
    }

    let mut stuck: Vec<TaskName> = states
        .iter()
        .filter(|(_, s)| !s.is_terminal())
        .map(|(name, _)| name.clone())
        .collect();
    if stuck.is_empty() {
        return Ok(());
    }

    stuck.sort();
    Err(PolldagError::Deadlock { run_id, stuck })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_task_with_nothing_running_is_a_deadlock() {
        let states = HashMap::from([
            ("encode".to_string(), TaskState::Pending),
            ("sensor".to_string(), TaskState::Failed),
        ]);

        match check_progress(7, &states) {
            Err(PolldagError::Deadlock { run_id, stuck }) => {
                assert_eq!(run_id, 7);
                assert_eq!(stuck, vec!["encode".to_string()]);
            }
            other => panic!("expected deadlock, got {other:?}"),
        }
    }

    #[test]
    fn running_task_means_progress_is_possible() {
        let states = HashMap::from([
            ("encode".to_string(), TaskState::Pending),
            ("sensor".to_string(), TaskState::Running),
        ]);

        assert!(check_progress(1, &states).is_ok());
    }
}
