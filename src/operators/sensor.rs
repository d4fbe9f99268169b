// src/operators/sensor.rs

use std::sync::Arc;

use anyhow::bail;
use tracing::info;

use super::{BoxFuture, Operator, RemoteSource, TaskContext, Template};
use crate::exec::{PollOutcome, Poller};

/// Waits until the remote source publishes the file for the current run.
pub struct FileSensor {
    source: Arc<dyn RemoteSource>,
    filename: Template,
    poller: Poller,
}

impl FileSensor {
    pub fn new(source: Arc<dyn RemoteSource>, filename: Template, poller: Poller) -> Self {
        Self {
            source,
            filename,
            poller,
        }
    }
}

impl Operator for FileSensor {
    fn kind(&self) -> &'static str {
        "sensor"
    }

    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let name = ctx.render(&self.filename);
            info!(
                task = %ctx.task,
                run_id = ctx.run_id,
                source = %self.source.describe(),
                file = %name,
                "poking for file"
            );

            let source = &self.source;
            let file = name.as_str();
            let report = self.poller.poll(move || source.exists(file)).await?;

            match report.outcome {
                PollOutcome::Satisfied => {
                    info!(
                        task = %ctx.task,
                        run_id = ctx.run_id,
                        checks = report.checks,
                        "file found"
                    );
                    Ok(())
                }
                PollOutcome::TimedOut => bail!(
                    "{} did not appear at {} within {:?} ({} checks)",
                    name,
                    self.source.describe(),
                    self.poller.timeout(),
                    report.checks
                ),
            }
        })
    }
}
