use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use polldag::dag::ScheduledTask;
use polldag::engine::{TaskCompletion, TaskOutcome};
use polldag::errors::Result;
use polldag::exec::ExecutorBackend;
use tokio::sync::mpsc;

/// A fake executor that:
/// - records which tasks were scheduled, in order
/// - never calls the operator
/// - immediately reports the configured outcome (default `Success`).
pub struct RecordingExecutor {
    completion_tx: mpsc::Sender<TaskCompletion>,
    executed: Arc<Mutex<Vec<String>>>,
    outcomes: HashMap<String, TaskOutcome>,
}

impl RecordingExecutor {
    pub fn new(
        completion_tx: mpsc::Sender<TaskCompletion>,
        executed: Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            completion_tx,
            executed,
            outcomes: HashMap::new(),
        }
    }

    pub fn with_outcome(mut self, task: &str, outcome: TaskOutcome) -> Self {
        self.outcomes.insert(task.to_string(), outcome);
        self
    }
}

impl ExecutorBackend for RecordingExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.completion_tx.clone();
        let executed = Arc::clone(&self.executed);

        Box::pin(async move {
            for t in tasks {
                executed.lock().unwrap().push(t.name.clone());

                let outcome = self
                    .outcomes
                    .get(&t.name)
                    .copied()
                    .unwrap_or(TaskOutcome::Success);

                tx.send(TaskCompletion {
                    task: t.name.clone(),
                    run_id: t.run_id,
                    outcome,
                    attempts: 1,
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
