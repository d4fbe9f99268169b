// src/operators/download.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use super::{BoxFuture, Operator, RemoteSource, TaskContext, Template};
use crate::fs::FileSystem;

/// Copies the current run's file from the remote source into `disk_path`.
///
/// The local copy is only rewritten when its blake3 digest differs from the
/// remote content.
pub struct Downloader {
    source: Arc<dyn RemoteSource>,
    filename: Template,
    disk_path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl Downloader {
    pub fn new(
        source: Arc<dyn RemoteSource>,
        filename: Template,
        disk_path: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            source,
            filename,
            disk_path: disk_path.into(),
            fs,
        }
    }

    fn local_digest(&self, path: &std::path::Path) -> Option<blake3::Hash> {
        if !self.fs.is_file(path) {
            return None;
        }
        self.fs.read(path).ok().map(|bytes| blake3::hash(&bytes))
    }
}

impl Operator for Downloader {
    fn kind(&self) -> &'static str {
        "download"
    }

    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let name = ctx.render(&self.filename);
            let bytes = self
                .source
                .fetch(&name)
                .await
                .with_context(|| format!("fetching {} from {}", name, self.source.describe()))?;

            let target = self.disk_path.join(&name);
            let remote_digest = blake3::hash(&bytes);

            if self.local_digest(&target) == Some(remote_digest) {
                info!(
                    task = %ctx.task,
                    run_id = ctx.run_id,
                    file = %target.display(),
                    "local copy is up to date"
                );
                return Ok(());
            }

            self.fs.write(&target, &bytes)?;
            info!(
                task = %ctx.task,
                run_id = ctx.run_id,
                file = %target.display(),
                bytes = bytes.len(),
                digest = %remote_digest.to_hex(),
                "downloaded file"
            );
            Ok(())
        })
    }
}
