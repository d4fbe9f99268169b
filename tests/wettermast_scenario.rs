// tests/wettermast_scenario.rs
//
// sensor -> {download (all_success), file_check (all_failed)}
//        -> encode (one_success) -> merge -> project

use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use polldag::dag::{DagGraph, NO_UPSTREAM, Outcome, RunReport, Scheduler, Task};
use polldag::engine::{Runtime, TaskCompletion};
use polldag::exec::PoolExecutorBackend;
use polldag::types::TriggerRule;
use polldag_test_utils::scripted::ScriptedOperator;
use polldag_test_utils::{init_tracing, logical_time, with_timeout};
use tokio::sync::mpsc;

type TestResult = Result<(), Box<dyn Error>>;

struct Pipeline {
    graph: DagGraph,
    ops: HashMap<&'static str, Arc<ScriptedOperator>>,
}

impl Pipeline {
    fn new(sensor_ok: bool, file_check_ok: bool) -> Self {
        let ops: HashMap<&'static str, Arc<ScriptedOperator>> = [
            ("sensor", sensor_ok),
            ("download", true),
            ("file_check", file_check_ok),
            ("encode", true),
            ("merge", true),
            ("project", true),
        ]
        .into_iter()
        .map(|(name, ok)| {
            let op = if ok {
                ScriptedOperator::succeeding()
            } else {
                ScriptedOperator::failing()
            };
            (name, op.into_arc())
        })
        .collect();

        let task = |name: &str| Task::new(name, ops[name].clone());

        let mut graph = DagGraph::new();
        graph.add_task(task("sensor"), NO_UPSTREAM).unwrap();
        graph.add_task(task("download"), ["sensor"]).unwrap();
        graph
            .add_task(
                task("file_check").with_trigger_rule(TriggerRule::AllFailed),
                ["sensor"],
            )
            .unwrap();
        graph
            .add_task(
                task("encode").with_trigger_rule(TriggerRule::OneSuccess),
                ["download", "file_check"],
            )
            .unwrap();
        graph.add_task(task("merge"), ["encode"]).unwrap();
        graph.add_task(task("project"), ["merge"]).unwrap();

        Self { graph, ops }
    }

    fn calls(&self, name: &str) -> u32 {
        self.ops[name].calls()
    }

    async fn run(self) -> Result<(RunReport, Self), Box<dyn Error>> {
        let (tx, rx) = mpsc::channel::<TaskCompletion>(64);
        let executor = PoolExecutorBackend::new(tx, 4);
        let scheduler = Scheduler::new(Arc::new(self.graph.clone()));
        let mut runtime = Runtime::new(scheduler, rx, executor);

        let report = with_timeout(runtime.run_once(logical_time())).await?;
        Ok((report, self))
    }
}

#[tokio::test]
async fn sensor_success_downloads_and_skips_fallback() -> TestResult {
    init_tracing();

    let (report, pipeline) = Pipeline::new(true, true).run().await?;

    assert_eq!(report.outcome_of("sensor"), Some(Outcome::Success));
    assert_eq!(report.outcome_of("download"), Some(Outcome::Success));
    assert_eq!(report.outcome_of("file_check"), Some(Outcome::Skipped));
    assert_eq!(report.outcome_of("encode"), Some(Outcome::Success));
    assert_eq!(report.outcome_of("merge"), Some(Outcome::Success));
    assert_eq!(report.outcome_of("project"), Some(Outcome::Success));
    assert!(report.is_success());

    assert_eq!(pipeline.calls("file_check"), 0);
    assert_eq!(pipeline.calls("encode"), 1);
    Ok(())
}

#[tokio::test]
async fn sensor_failure_falls_back_to_local_copy() -> TestResult {
    init_tracing();

    let (report, pipeline) = Pipeline::new(false, true).run().await?;

    assert_eq!(report.outcome_of("sensor"), Some(Outcome::Failed));
    assert_eq!(report.outcome_of("download"), Some(Outcome::UpstreamFailed));
    assert_eq!(report.outcome_of("file_check"), Some(Outcome::Success));
    assert_eq!(report.outcome_of("encode"), Some(Outcome::Success));
    assert_eq!(report.outcome_of("project"), Some(Outcome::Success));
    assert!(report.is_success(), "sensor failure is absorbed by the join");

    assert_eq!(pipeline.calls("download"), 0);
    assert_eq!(pipeline.calls("file_check"), 1);
    Ok(())
}

#[tokio::test]
async fn no_remote_and_no_local_copy_fails_the_run() -> TestResult {
    init_tracing();

    let (report, pipeline) = Pipeline::new(false, false).run().await?;

    assert_eq!(report.outcome_of("file_check"), Some(Outcome::Failed));
    assert_eq!(report.outcome_of("encode"), Some(Outcome::UpstreamFailed));
    assert_eq!(report.outcome_of("merge"), Some(Outcome::UpstreamFailed));
    assert_eq!(report.outcome_of("project"), Some(Outcome::UpstreamFailed));
    assert!(!report.is_success());
    assert_eq!(report.failed_leaves(), vec!["project"]);

    assert_eq!(pipeline.calls("encode"), 0);
    Ok(())
}

#[tokio::test]
async fn each_run_starts_from_pending() -> TestResult {
    init_tracing();

    let pipeline = Pipeline::new(true, true);
    let (tx, rx) = mpsc::channel::<TaskCompletion>(64);
    let mut runtime = Runtime::new(
        Scheduler::new(Arc::new(pipeline.graph.clone())),
        rx,
        PoolExecutorBackend::new(tx, 2),
    );

    let first = with_timeout(runtime.run_once(logical_time())).await?;
    let second = with_timeout(runtime.run_once(logical_time())).await?;

    assert_eq!(first.run_id, 1);
    assert_eq!(second.run_id, 2);
    assert_eq!(first.outcomes, second.outcomes);
    assert_eq!(pipeline.calls("sensor"), 2);
    assert_eq!(pipeline.calls("project"), 2);
    Ok(())
}
