// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning work
//! itself. Production code uses [`PoolExecutorBackend`]; tests can provide
//! their own implementation that records scheduled tasks and answers with
//! canned completions.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::debug;

use crate::dag::ScheduledTask;
use crate::engine::TaskCompletion;
use crate::errors::Result;

use super::task_runner::run_task;

/// Trait abstracting how scheduled tasks are executed.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution.
    ///
    /// The implementation must eventually report one [`TaskCompletion`] per
    /// task on the channel the runtime listens to.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Runs every scheduled task on its own Tokio task, with at most `workers`
/// operator attempts executing at once.
///
/// A task waiting for a permit, sleeping between retries or between sensor
/// checks never blocks the runtime loop. Retry delays release the permit;
/// sensor checks hold it for the whole poll.
#[derive(Debug, Clone)]
pub struct PoolExecutorBackend {
    completion_tx: mpsc::Sender<TaskCompletion>,
    permits: Arc<Semaphore>,
}

impl PoolExecutorBackend {
    pub fn new(completion_tx: mpsc::Sender<TaskCompletion>, workers: usize) -> Self {
        Self {
            completion_tx,
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }
}

impl ExecutorBackend for PoolExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.completion_tx.clone();
        let permits = Arc::clone(&self.permits);

        Box::pin(async move {
            for task in tasks {
                debug!(task = %task.name, run_id = task.run_id, "dispatching task");
                tokio::spawn(run_task(task, Arc::clone(&permits), tx.clone()));
            }
            Ok(())
        })
    }
}
