// src/pipeline.rs

//! Turning a validated config into a runnable graph.

use std::sync::Arc;

use tracing::debug;

use crate::config::{ConfigFile, OperatorConfig, parse_duration, parse_time_bound};
use crate::dag::{DagGraph, NO_UPSTREAM, Task};
use crate::errors::Result;
use crate::exec::Poller;
use crate::frame::AsciiFormat;
use crate::fs::FileSystem;
use crate::operators::{
    Command, DirSource, Downloader, Encoder, FileCheck, FileSensor, Merger, Operator, Projector,
    Template,
};

/// Build the task graph described by `cfg`, with every operator doing its
/// file access through `fs`.
pub fn build_graph(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) -> Result<DagGraph> {
    let mut graph = DagGraph::new();

    for (name, task_cfg) in cfg.tasks() {
        let operator = build_operator(&task_cfg.operator, &fs)?;
        let policy = task_cfg.retry_policy(cfg.default())?;
        let task = Task::new(name.clone(), operator)
            .with_trigger_rule(task_cfg.trigger_rule)
            .with_retry_policy(policy);
        graph.add_task(task, NO_UPSTREAM)?;
    }

    for (name, task_cfg) in cfg.tasks() {
        for upstream in &task_cfg.after {
            graph.add_dependency(name, upstream)?;
        }
    }

    debug!(tasks = graph.len(), "graph built from config");
    Ok(graph)
}

pub fn build_operator(op: &OperatorConfig, fs: &Arc<dyn FileSystem>) -> Result<Arc<dyn Operator>> {
    let operator: Arc<dyn Operator> = match op {
        OperatorConfig::Sensor {
            source_dir,
            filename_template,
            poke_interval,
            timeout,
            max_consecutive_errors,
        } => {
            let mut poller = Poller::new(parse_duration(poke_interval)?, parse_duration(timeout)?);
            if let Some(limit) = max_consecutive_errors {
                poller = poller.with_max_consecutive_errors(*limit);
            }
            Arc::new(FileSensor::new(
                Arc::new(DirSource::new(source_dir, Arc::clone(fs))),
                Template::new(filename_template.as_str())?,
                poller,
            ))
        }
        OperatorConfig::Download {
            source_dir,
            filename_template,
            disk_path,
        } => Arc::new(Downloader::new(
            Arc::new(DirSource::new(source_dir, Arc::clone(fs))),
            Template::new(filename_template.as_str())?,
            disk_path,
            Arc::clone(fs),
        )),
        OperatorConfig::FileCheck {
            parent_dir,
            filename_template,
        } => Arc::new(FileCheck::new(
            parent_dir,
            Template::new(filename_template.as_str())?,
            Arc::clone(fs),
        )),
        OperatorConfig::Encode {
            input_dir,
            input_template,
            output_dir,
            output_template,
            timestamp_format,
            missing_values,
        } => {
            let mut format = AsciiFormat::default();
            if let Some(ts) = timestamp_format {
                format.timestamp_format = ts.clone();
            }
            if let Some(markers) = missing_values {
                format.missing_values = markers.clone();
            }
            Arc::new(
                Encoder::new(
                    input_dir,
                    Template::new(input_template.as_str())?,
                    output_dir,
                    Template::new(output_template.as_str())?,
                    Arc::clone(fs),
                )
                .with_format(format),
            )
        }
        OperatorConfig::Merge {
            input_dir,
            input_template,
            store,
            time_bound,
        } => {
            let bound = parse_time_bound(time_bound)?;
            Arc::new(Merger::new(
                input_dir,
                Template::new(input_template.as_str())?,
                store,
                bound,
                Arc::clone(fs),
            ))
        }
        OperatorConfig::Project {
            input,
            output,
            columns,
        } => Arc::new(Projector::new(input, output, columns.clone(), Arc::clone(fs))),
        OperatorConfig::Command { cmd } => Arc::new(Command::new(Template::new(cmd.as_str())?)),
    };
    Ok(operator)
}
