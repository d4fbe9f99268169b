// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolldagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    UnknownTask(String),

    #[error("Duplicate task: {0}")]
    DuplicateTask(String),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    /// No task can make progress although the run has not finished.
    #[error("Run {run_id} deadlocked; stuck tasks: {}", .stuck.join(", "))]
    Deadlock { run_id: u64, stuck: Vec<String> },

    #[error("Sensor gave up after {errors} consecutive check errors: {last_error}")]
    SensorUnreachable { errors: u32, last_error: String },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PolldagError {
    /// Errors raised while building a graph or loading its config.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            PolldagError::ConfigError(_)
                | PolldagError::UnknownTask(_)
                | PolldagError::DuplicateTask(_)
                | PolldagError::DagCycle(_)
                | PolldagError::TomlError(_)
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PolldagError>;
