// src/engine/runtime.rs

use std::fmt;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::dag::{RunReport, ScheduledTask, Scheduler};
use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::TaskCompletion;

/// Drives one DAG run at a time: dispatches whatever the scheduler marks
/// runnable and feeds completions back until the run reaches a fixed point.
///
/// The runtime loop is the only writer of scheduler state; executions only
/// talk to it through the completion channel.
pub struct Runtime<E: ExecutorBackend> {
    scheduler: Scheduler,
    completion_rx: mpsc::Receiver<TaskCompletion>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(
        scheduler: Scheduler,
        completion_rx: mpsc::Receiver<TaskCompletion>,
        executor: E,
    ) -> Self {
        Self {
            scheduler,
            completion_rx,
            executor,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Execute one full traversal of the graph.
    ///
    /// Returns the terminal outcome of every task, or
    /// [`crate::errors::PolldagError::Deadlock`] if the run got stuck.
    pub async fn run_once(&mut self, logical_time: DateTime<Utc>) -> Result<RunReport> {
        let step = self.scheduler.start_new_run(logical_time)?;
        let run_id = self.scheduler.last_run_id();
        info!(run_id, %logical_time, "DAG run started");

        self.spawn_ready(step.newly_scheduled).await?;

        while !self.scheduler.is_idle() {
            let done = self
                .completion_rx
                .recv()
                .await
                .ok_or_else(|| anyhow!("completion channel closed during run {run_id}"))?;

            if done.run_id != run_id {
                debug!(
                    task = %done.task,
                    stale_run_id = done.run_id,
                    run_id,
                    "ignoring completion from a previous run"
                );
                continue;
            }

            debug!(
                task = %done.task,
                run_id,
                outcome = ?done.outcome,
                attempts = done.attempts,
                "runtime received completion"
            );

            let step = self.scheduler.handle_completion(&done.task, done.outcome)?;
            self.spawn_ready(step.newly_scheduled).await?;
        }

        let report = self.scheduler.report();
        report.log_summary();
        Ok(report)
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, "spawning ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
