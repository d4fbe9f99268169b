// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::config::duration::parse_duration;
use crate::errors::Result;
use crate::exec::RetryPolicy;
use crate::types::TriggerRule;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// interval = "15m"
/// workers = 4
///
/// [default]
/// max_attempts = 3
/// retry_delay = "5m"
///
/// [task.sensor_ftp]
/// kind = "sensor"
/// source_dir = "/mnt/ftp/wettermast"
/// filename_template = "%G_W%V_MASTER_M10.txt"
///
/// [task.downloader_ftp]
/// kind = "download"
/// after = ["sensor_ftp"]
/// source_dir = "/mnt/ftp/wettermast"
/// filename_template = "%G_W%V_MASTER_M10.txt"
/// disk_path = "data/raw"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub default: DefaultSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A configuration that passed validation.
///
/// Only obtainable through `TryFrom<RawConfigFile>`, so holders can rely on
/// durations and templates parsing and on the task graph being acyclic.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    default: DefaultSection,
    task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        default: DefaultSection,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self {
            config,
            default,
            task,
        }
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn default(&self) -> &DefaultSection {
        &self.default
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Cadence of recurring runs.
    #[serde(default = "default_interval")]
    pub interval: String,

    /// Upper bound on tasks executing at the same time.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_interval() -> String {
    "15m".to_string()
}

fn default_workers() -> usize {
    4
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            workers: default_workers(),
        }
    }
}

/// `[default]` section: retry policy applied to tasks that do not override it.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultSection {
    /// Retries after a failed first attempt.
    #[serde(default)]
    pub max_attempts: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay: String,

    #[serde(default)]
    pub attempt_timeout: Option<String>,
}

fn default_retry_delay() -> String {
    "5m".to_string()
}

impl Default for DefaultSection {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            retry_delay: default_retry_delay(),
            attempt_timeout: None,
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Upstream tasks; this is the TOML `after = ["A", "B"]` field.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub trigger_rule: TriggerRule,

    /// Overrides `default.max_attempts`.
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Overrides `default.retry_delay`.
    #[serde(default)]
    pub retry_delay: Option<String>,

    /// Overrides `default.attempt_timeout`.
    #[serde(default)]
    pub attempt_timeout: Option<String>,

    #[serde(flatten)]
    pub operator: OperatorConfig,
}

/// Operator-specific keys, selected by `kind`.
///
/// Every `*_template` key is a chrono strftime pattern rendered with the
/// run's logical time.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperatorConfig {
    Sensor {
        source_dir: PathBuf,
        filename_template: String,
        #[serde(default = "default_poke_interval")]
        poke_interval: String,
        #[serde(default = "default_sensor_timeout")]
        timeout: String,
        #[serde(default)]
        max_consecutive_errors: Option<u32>,
    },
    Download {
        source_dir: PathBuf,
        filename_template: String,
        disk_path: PathBuf,
    },
    FileCheck {
        parent_dir: PathBuf,
        filename_template: String,
    },
    Encode {
        input_dir: PathBuf,
        input_template: String,
        output_dir: PathBuf,
        output_template: String,
        #[serde(default)]
        timestamp_format: Option<String>,
        #[serde(default)]
        missing_values: Option<Vec<String>>,
    },
    Merge {
        input_dir: PathBuf,
        input_template: String,
        store: PathBuf,
        time_bound: String,
    },
    Project {
        input: PathBuf,
        output: PathBuf,
        columns: Vec<String>,
    },
    Command {
        /// Shell command line; `%` must be written `%%`.
        cmd: String,
    },
}

fn default_poke_interval() -> String {
    "60s".to_string()
}

fn default_sensor_timeout() -> String {
    "7d".to_string()
}

impl OperatorConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            OperatorConfig::Sensor { .. } => "sensor",
            OperatorConfig::Download { .. } => "download",
            OperatorConfig::FileCheck { .. } => "file_check",
            OperatorConfig::Encode { .. } => "encode",
            OperatorConfig::Merge { .. } => "merge",
            OperatorConfig::Project { .. } => "project",
            OperatorConfig::Command { .. } => "command",
        }
    }

    /// Templates this operator renders, for validation.
    pub fn templates(&self) -> Vec<&str> {
        match self {
            OperatorConfig::Sensor {
                filename_template, ..
            }
            | OperatorConfig::Download {
                filename_template, ..
            }
            | OperatorConfig::FileCheck {
                filename_template, ..
            } => vec![filename_template.as_str()],
            OperatorConfig::Encode {
                input_template,
                output_template,
                ..
            } => vec![input_template.as_str(), output_template.as_str()],
            OperatorConfig::Merge { input_template, .. } => vec![input_template.as_str()],
            OperatorConfig::Project { .. } => Vec::new(),
            OperatorConfig::Command { cmd } => vec![cmd.as_str()],
        }
    }

    /// Duration strings this operator carries, labelled by key.
    pub fn durations(&self) -> Vec<(&'static str, &str)> {
        match self {
            OperatorConfig::Sensor {
                poke_interval,
                timeout,
                ..
            } => vec![
                ("poke_interval", poke_interval.as_str()),
                ("timeout", timeout.as_str()),
            ],
            OperatorConfig::Merge { time_bound, .. } => vec![("time_bound", time_bound.as_str())],
            _ => Vec::new(),
        }
    }
}

impl TaskConfig {
    /// The task's retry policy, with `[default]` filling unset keys.
    pub fn retry_policy(&self, default: &DefaultSection) -> Result<RetryPolicy> {
        let max_attempts = self.max_attempts.unwrap_or(default.max_attempts);
        let delay = parse_duration(self.retry_delay.as_deref().unwrap_or(&default.retry_delay))?;
        let policy = RetryPolicy::new(max_attempts, delay);

        match self
            .attempt_timeout
            .as_deref()
            .or(default.attempt_timeout.as_deref())
        {
            Some(limit) => Ok(policy.with_attempt_timeout(parse_duration(limit)?)),
            None => Ok(policy),
        }
    }
}
