// src/operators/file_check.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use tracing::info;

use super::{BoxFuture, Operator, TaskContext, Template};
use crate::fs::FileSystem;

/// Succeeds iff the current run's file is already on local disk.
pub struct FileCheck {
    parent_dir: PathBuf,
    filename: Template,
    fs: Arc<dyn FileSystem>,
}

impl FileCheck {
    pub fn new(parent_dir: impl Into<PathBuf>, filename: Template, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            parent_dir: parent_dir.into(),
            filename,
            fs,
        }
    }
}

impl Operator for FileCheck {
    fn kind(&self) -> &'static str {
        "file_check"
    }

    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let path = self.parent_dir.join(ctx.render(&self.filename));
            if !self.fs.is_file(&path) {
                bail!("{} is not available locally", path.display());
            }
            info!(task = %ctx.task, run_id = ctx.run_id, file = %path.display(), "using local copy");
            Ok(())
        })
    }
}
