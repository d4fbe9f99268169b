// src/exec/task_runner.rs

//! Individual task runner.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::dag::ScheduledTask;
use crate::engine::TaskCompletion;
use crate::exec::retry::run_with_retry_in_pool;
use crate::operators::{Operator, TaskContext};

/// Run one scheduled task under its retry policy and report the result.
///
/// Every attempt takes a worker slot from `slots`. Operator errors and
/// panics never escape: they become a `Failed` completion once the policy
/// has no attempts left.
pub async fn run_task(
    task: ScheduledTask,
    slots: Arc<Semaphore>,
    completion_tx: mpsc::Sender<TaskCompletion>,
) {
    let ctx = task.context();

    info!(
        task = %task.name,
        run_id = task.run_id,
        operator = task.operator.kind(),
        max_attempts = task.retry_policy.effective_attempts(),
        "starting task"
    );

    let operator = &task.operator;
    let ctx = &ctx;
    let attempted = run_with_retry_in_pool(&task.retry_policy, &task.name, &slots, move |_attempt| {
        execute_isolated(Arc::clone(operator), ctx.clone())
    })
    .await;

    info!(
        task = %task.name,
        run_id = task.run_id,
        outcome = ?attempted.outcome,
        attempts = attempted.attempts,
        "task finished"
    );

    let completion = TaskCompletion {
        task: task.name.clone(),
        run_id: task.run_id,
        outcome: attempted.outcome,
        attempts: attempted.attempts,
    };

    if completion_tx.send(completion).await.is_err() {
        error!(
            task = %task.name,
            run_id = task.run_id,
            "runtime is gone; dropping task completion"
        );
    }
}

/// Execute the operator on its own Tokio task so a panic surfaces as an
/// error of this attempt.
async fn execute_isolated(operator: Arc<dyn Operator>, ctx: TaskContext) -> anyhow::Result<()> {
    let mut handle = AbortOnDrop(tokio::spawn(async move { operator.execute(&ctx).await }));
    match (&mut handle.0).await {
        Ok(result) => result,
        Err(err) if err.is_panic() => Err(anyhow!("operator panicked: {err}")),
        Err(err) => Err(anyhow!("operator did not complete: {err}")),
    }
}

// Stops the operator when its attempt is dropped, e.g. on attempt timeout.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}
