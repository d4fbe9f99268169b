// src/operators/project.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use super::{BoxFuture, Operator, TaskContext};
use crate::frame::Frame;
use crate::fs::FileSystem;

/// Writes a column subset of a stored frame.
pub struct Projector {
    input: PathBuf,
    output: PathBuf,
    columns: Vec<String>,
    fs: Arc<dyn FileSystem>,
}

impl Projector {
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        columns: Vec<String>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            columns,
            fs,
        }
    }
}

impl Operator for Projector {
    fn kind(&self) -> &'static str {
        "project"
    }

    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let text = self.fs.read_to_string(&self.input)?;
            let frame = Frame::from_json(&text)
                .and_then(|f| f.select(&self.columns))
                .with_context(|| format!("projecting {}", self.input.display()))?;

            self.fs.write(&self.output, frame.to_json()?.as_bytes())?;
            info!(
                task = %ctx.task,
                run_id = ctx.run_id,
                output = %self.output.display(),
                columns = ?self.columns,
                rows = frame.len(),
                "projected columns"
            );
            Ok(())
        })
    }
}
