// src/operators/source.rs

//! Where sensors and downloaders look for new measurement files.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow};

use super::BoxFuture;
use crate::fs::FileSystem;

/// A remote endpoint that publishes measurement files by name.
pub trait RemoteSource: Send + Sync {
    /// Whether `name` is currently published. An error means the endpoint
    /// could not be reached.
    fn exists<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<bool>>;

    fn fetch<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<u8>>>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// A remote endpoint mounted or mirrored as a local directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }
}

impl RemoteSource for DirSource {
    fn exists<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            if !self.fs.exists(&self.root) {
                return Err(anyhow!("source directory {:?} is not reachable", self.root));
            }
            Ok(self.fs.is_file(&self.root.join(name)))
        })
    }

    fn fetch<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move { self.fs.read(&self.root.join(name)) })
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}
