#![allow(dead_code)]

use std::collections::BTreeMap;

use polldag::config::{
    ConfigFile, ConfigSection, DefaultSection, OperatorConfig, RawConfigFile, TaskConfig,
};
use polldag::types::TriggerRule;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                default: DefaultSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn interval(mut self, interval: &str) -> Self {
        self.config.config.interval = interval.to_string();
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.config.workers = workers;
        self
    }

    pub fn default_max_attempts(mut self, attempts: u32) -> Self {
        self.config.default.max_attempts = attempts;
        self
    }

    pub fn default_retry_delay(mut self, delay: &str) -> Self {
        self.config.default.retry_delay = delay.to_string();
        self
    }

    /// The unvalidated config, for tests that expect validation to fail.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(operator: OperatorConfig) -> Self {
        Self {
            task: TaskConfig {
                after: vec![],
                trigger_rule: TriggerRule::default(),
                max_attempts: None,
                retry_delay: None,
                attempt_timeout: None,
                operator,
            },
        }
    }

    /// A `command` task; the cheapest operator to put in a graph.
    pub fn command(cmd: &str) -> Self {
        Self::new(OperatorConfig::Command {
            cmd: cmd.to_string(),
        })
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn trigger_rule(mut self, rule: TriggerRule) -> Self {
        self.task.trigger_rule = rule;
        self
    }

    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.task.max_attempts = Some(attempts);
        self
    }

    pub fn retry_delay(mut self, delay: &str) -> Self {
        self.task.retry_delay = Some(delay.to_string());
        self
    }

    pub fn attempt_timeout(mut self, limit: &str) -> Self {
        self.task.attempt_timeout = Some(limit.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
