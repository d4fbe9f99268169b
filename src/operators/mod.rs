// src/operators/mod.rs

//! Task callbacks.
//!
//! Every graph node holds an [`Operator`]. The scheduler never looks inside
//! one: it hands the operator a [`TaskContext`] and waits for the boxed
//! future to resolve. Operators keep their static configuration (paths,
//! templates, poll timings) and read per-run data from the context.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};

use crate::engine::TaskName;

pub mod command;
pub mod download;
pub mod file_check;
pub mod encode;
pub mod merge;
pub mod project;
pub mod sensor;
pub mod source;
pub mod template;

pub use command::Command;
pub use download::Downloader;
pub use encode::Encoder;
pub use file_check::FileCheck;
pub use merge::Merger;
pub use project::Projector;
pub use sensor::FileSensor;
pub use source::{DirSource, RemoteSource};
pub use template::Template;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait Operator: Send + Sync {
    /// Short name of the operator kind, used in logs.
    fn kind(&self) -> &'static str;

    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Per-run data handed to an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContext {
    pub task: TaskName,
    pub run_id: u64,
    /// Logical time of the run.
    pub logical_time: DateTime<Utc>,
}

impl TaskContext {
    pub fn render(&self, template: &Template) -> String {
        template.render(self.logical_time)
    }
}
