// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod frame;
pub mod fs;
pub mod logging;
pub mod operators;
pub mod pipeline;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_and_validate, parse_duration};
use crate::dag::{DagGraph, Scheduler};
use crate::engine::{Runtime, TaskCompletion, run_forever};
use crate::exec::PoolExecutorBackend;
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::build_graph;

/// High-level entry point used by `main.rs`.
///
/// Loads the config, builds the graph and then either prints it
/// (`--dry-run`), runs one cycle (`--once`) or recurs until Ctrl-C.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading config from {:?}", args.config))?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let graph = Arc::new(build_graph(&cfg, fs)?);

    if args.dry_run {
        print_dry_run(&cfg, &graph);
        return Ok(());
    }

    let (completion_tx, completion_rx) = mpsc::channel::<TaskCompletion>(64);
    let executor = PoolExecutorBackend::new(completion_tx, cfg.config().workers);
    let mut runtime = Runtime::new(Scheduler::new(graph), completion_rx, executor);

    if args.once {
        let report = runtime.run_once(Utc::now()).await?;
        if !report.is_success() {
            bail!(
                "run {} did not succeed; failed leaves: {}",
                report.run_id,
                report.failed_leaves().join(", ")
            );
        }
        return Ok(());
    }

    let interval = parse_duration(&cfg.config().interval)?;
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received; stopping after the current run"),
            Err(e) => {
                error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    };

    let runs = run_forever(&mut runtime, interval, shutdown).await?;
    info!(runs, "polldag stopped");
    Ok(())
}

/// Print tasks in dependency order with their rules and policies.
fn print_dry_run(cfg: &ConfigFile, graph: &DagGraph) {
    println!("polldag dry-run");
    println!("  config.interval = {}", cfg.config().interval);
    println!("  config.workers = {}", cfg.config().workers);
    println!();

    println!("tasks ({}):", graph.len());
    for name in graph.topological_order() {
        let Some(task) = graph.task(name) else {
            continue;
        };
        println!("  - {name}");
        println!("      kind: {}", task.operator().kind());
        println!("      trigger_rule: {}", task.trigger_rule());

        let upstream = graph.dependencies_of(name);
        if !upstream.is_empty() {
            println!("      after: {:?}", upstream);
        }

        let policy = task.retry_policy();
        println!(
            "      attempts: {} (delay {:?})",
            policy.effective_attempts(),
            policy.delay
        );
        if let Some(limit) = policy.attempt_timeout {
            println!("      attempt_timeout: {:?}", limit);
        }
    }

    debug!("dry-run complete (no execution)");
}
