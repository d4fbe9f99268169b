// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::duration::{parse_duration, parse_time_bound};
use crate::config::model::{ConfigFile, OperatorConfig, RawConfigFile};
use crate::errors::{PolldagError, Result};
use crate::operators::Template;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PolldagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.default, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_tasks(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(PolldagError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.workers == 0 {
        return Err(PolldagError::ConfigError(
            "[config].workers must be >= 1 (got 0)".to_string(),
        ));
    }

    let interval = parse_duration(&cfg.config.interval)
        .map_err(|e| PolldagError::ConfigError(format!("[config].interval: {}", e)))?;
    if interval.is_zero() {
        return Err(PolldagError::ConfigError(
            "[config].interval must be greater than zero".to_string(),
        ));
    }

    parse_duration(&cfg.default.retry_delay)
        .map_err(|e| PolldagError::ConfigError(format!("[default].retry_delay: {}", e)))?;
    if let Some(limit) = &cfg.default.attempt_timeout {
        parse_duration(limit)
            .map_err(|e| PolldagError::ConfigError(format!("[default].attempt_timeout: {}", e)))?;
    }

    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        let in_task = |e: PolldagError| PolldagError::ConfigError(format!("task '{}': {}", name, e));

        task.retry_policy(&cfg.default).map_err(in_task)?;

        for (key, value) in task.operator.durations() {
            parse_duration(value)
                .map_err(|e| PolldagError::ConfigError(format!("task '{}' {}: {}", name, key, e)))?;
        }

        for template in task.operator.templates() {
            Template::new(template).map_err(in_task)?;
        }

        match &task.operator {
            OperatorConfig::Encode {
                timestamp_format: Some(format),
                ..
            } => {
                Template::new(format.as_str()).map_err(in_task)?;
            }
            OperatorConfig::Merge { time_bound, .. } => {
                parse_time_bound(time_bound).map_err(in_task)?;
            }
            OperatorConfig::Project { columns, .. } if columns.is_empty() => {
                return Err(PolldagError::ConfigError(format!(
                    "task '{}' must project at least one column",
                    name
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if dep == name {
                return Err(PolldagError::DagCycle(format!(
                    "task '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !cfg.task.contains_key(dep) {
                return Err(PolldagError::UnknownTask(format!(
                    "task '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(PolldagError::DagCycle(format!(
            "cycle detected in task DAG involving task '{}'",
            cycle.node_id()
        ))),
    }
}
