// src/operators/merge.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;
use tracing::{debug, info};

use super::{BoxFuture, Operator, TaskContext, Template};
use crate::frame::Frame;
use crate::fs::FileSystem;

/// Folds the current run's encoded frame into a rolling store.
///
/// The store keeps at most `time_bound` of history, measured back from its
/// newest row.
pub struct Merger {
    input_dir: PathBuf,
    input: Template,
    store: PathBuf,
    time_bound: Duration,
    fs: Arc<dyn FileSystem>,
}

impl Merger {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        input: Template,
        store: impl Into<PathBuf>,
        time_bound: Duration,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            input,
            store: store.into(),
            time_bound,
            fs,
        }
    }

    fn load(&self, path: &std::path::Path) -> anyhow::Result<Frame> {
        let text = self.fs.read_to_string(path)?;
        Frame::from_json(&text).with_context(|| format!("decoding {}", path.display()))
    }
}

impl Operator for Merger {
    fn kind(&self) -> &'static str {
        "merge"
    }

    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let input = self.input_dir.join(ctx.render(&self.input));
            let fresh = self.load(&input)?;

            let existing = if self.fs.is_file(&self.store) {
                self.load(&self.store)?
            } else {
                debug!(task = %ctx.task, store = %self.store.display(), "starting a new store");
                Frame::default()
            };

            let mut merged = existing.merge(&fresh);
            let before = merged.len();
            merged.truncate_to(self.time_bound);

            self.fs.write(&self.store, merged.to_json()?.as_bytes())?;
            info!(
                task = %ctx.task,
                run_id = ctx.run_id,
                store = %self.store.display(),
                rows = merged.len(),
                dropped = before - merged.len(),
                "merged into store"
            );
            Ok(())
        })
    }
}
