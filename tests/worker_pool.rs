// tests/worker_pool.rs

use std::sync::{Arc, Mutex};
use std::time::Duration;

use polldag::dag::{DagGraph, NO_UPSTREAM, Outcome, Scheduler, Task};
use polldag::engine::{Runtime, TaskCompletion};
use polldag::exec::{PoolExecutorBackend, RetryPolicy};
use polldag_test_utils::recording_executor::RecordingExecutor;
use polldag_test_utils::scripted::{ConcurrencyProbe, ScriptedOperator};
use polldag_test_utils::{init_tracing, logical_time, with_timeout};
use tokio::sync::mpsc;
use tokio::time::Instant;

fn fan_out(probe: &Arc<ConcurrencyProbe>, width: usize) -> DagGraph {
    let mut graph = DagGraph::new();
    for i in 0..width {
        let op = ScriptedOperator::succeeding()
            .with_delay(Duration::from_secs(10))
            .with_probe(Arc::clone(probe));
        graph
            .add_task(Task::new(format!("fetch_{i}"), Arc::new(op)), NO_UPSTREAM)
            .unwrap();
    }
    graph
}

async fn run_with_workers(workers: usize) -> (usize, Duration) {
    let probe = ConcurrencyProbe::new();
    let graph = fan_out(&probe, 4);

    let (tx, rx) = mpsc::channel::<TaskCompletion>(16);
    let mut runtime = Runtime::new(
        Scheduler::new(Arc::new(graph)),
        rx,
        PoolExecutorBackend::new(tx, workers),
    );

    let started = Instant::now();
    let report = runtime.run_once(logical_time()).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.count(Outcome::Success), 4);

    (probe.peak(), started.elapsed())
}

#[tokio::test(start_paused = true)]
async fn ready_tasks_run_in_parallel() {
    init_tracing();

    let (peak, elapsed) = run_with_workers(4).await;
    assert_eq!(peak, 4);
    assert!(elapsed < Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn worker_bound_limits_parallelism() {
    init_tracing();

    let (peak, elapsed) = run_with_workers(2).await;
    assert_eq!(peak, 2);
    assert!(elapsed >= Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn single_worker_runs_sequentially() {
    init_tracing();

    let (peak, elapsed) = run_with_workers(1).await;
    assert_eq!(peak, 1);
    assert!(elapsed >= Duration::from_secs(40));
}

#[tokio::test]
async fn downstream_waits_for_every_upstream() {
    init_tracing();

    let mut graph = DagGraph::new();
    let op = || Arc::new(ScriptedOperator::succeeding());
    graph.add_task(Task::new("a", op()), NO_UPSTREAM).unwrap();
    graph.add_task(Task::new("b", op()), NO_UPSTREAM).unwrap();
    graph.add_task(Task::new("c", op()), ["a", "b"]).unwrap();

    let executed = Arc::new(Mutex::new(Vec::new()));
    let (tx, rx) = mpsc::channel::<TaskCompletion>(16);
    let executor = RecordingExecutor::new(tx, Arc::clone(&executed));
    let mut runtime = Runtime::new(Scheduler::new(Arc::new(graph)), rx, executor);

    let report = with_timeout(runtime.run_once(logical_time())).await.unwrap();
    assert!(report.is_success());

    let executed = executed.lock().unwrap().clone();
    assert_eq!(executed.len(), 3);
    assert_eq!(executed.last().map(String::as_str), Some("c"));
}

#[tokio::test(start_paused = true)]
async fn retry_delay_frees_the_worker_for_other_tasks() {
    init_tracing();

    let log = Arc::new(Mutex::new(Vec::new()));
    let flaky = ScriptedOperator::from_results([false]).with_log("flaky", Arc::clone(&log));
    let steady = ScriptedOperator::succeeding().with_log("steady", Arc::clone(&log));

    let mut graph = DagGraph::new();
    graph
        .add_task(
            Task::new("flaky", Arc::new(flaky))
                .with_retry_policy(RetryPolicy::new(1, Duration::from_secs(300))),
            NO_UPSTREAM,
        )
        .unwrap();
    graph.add_task(Task::new("steady", Arc::new(steady)), NO_UPSTREAM).unwrap();

    let (tx, rx) = mpsc::channel::<TaskCompletion>(16);
    let mut runtime = Runtime::new(
        Scheduler::new(Arc::new(graph)),
        rx,
        PoolExecutorBackend::new(tx, 1),
    );

    let report = runtime.run_once(logical_time()).await.unwrap();
    assert!(report.is_success());

    // The single worker serves "steady" while "flaky" waits to retry.
    let log = log.lock().unwrap().clone();
    assert_eq!(log.len(), 3);
    assert_eq!(log.last().map(String::as_str), Some("flaky"));
}
