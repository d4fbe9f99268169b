// src/operators/encode.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use tracing::info;

use super::{BoxFuture, Operator, TaskContext, Template};
use crate::frame::{AsciiFormat, Frame};
use crate::fs::FileSystem;

/// Turns a raw measurement table into a JSON [`Frame`].
pub struct Encoder {
    input_dir: PathBuf,
    input: Template,
    output_dir: PathBuf,
    output: Template,
    format: AsciiFormat,
    fs: Arc<dyn FileSystem>,
}

impl Encoder {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        input: Template,
        output_dir: impl Into<PathBuf>,
        output: Template,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            input,
            output_dir: output_dir.into(),
            output,
            format: AsciiFormat::default(),
            fs,
        }
    }

    pub fn with_format(mut self, format: AsciiFormat) -> Self {
        self.format = format;
        self
    }
}

impl Operator for Encoder {
    fn kind(&self) -> &'static str {
        "encode"
    }

    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let input = self.input_dir.join(ctx.render(&self.input));
            let output = self.output_dir.join(ctx.render(&self.output));

            let text = self.fs.read_to_string(&input)?;
            let frame = Frame::parse_ascii(&text, &self.format)
                .with_context(|| format!("parsing {}", input.display()))?;
            if frame.is_empty() {
                bail!("{} contains no measurements", input.display());
            }

            self.fs.write(&output, frame.to_json()?.as_bytes())?;
            info!(
                task = %ctx.task,
                run_id = ctx.run_id,
                input = %input.display(),
                output = %output.display(),
                rows = frame.len(),
                columns = frame.columns.len(),
                "encoded measurements"
            );
            Ok(())
        })
    }
}
