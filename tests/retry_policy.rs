// tests/retry_policy.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use polldag::dag::{DagGraph, NO_UPSTREAM, Outcome, Scheduler, Task};
use polldag::engine::{Runtime, TaskCompletion, TaskOutcome};
use polldag::exec::{PoolExecutorBackend, RetryPolicy, run_with_retry};
use polldag::types::TriggerRule;
use polldag_test_utils::scripted::ScriptedOperator;
use polldag_test_utils::{init_tracing, logical_time, with_timeout};
use tokio::sync::mpsc;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn fail_once_then_succeed_takes_two_attempts() {
    init_tracing();

    let policy = RetryPolicy::new(2, Duration::from_secs(30));
    let calls = AtomicU32::new(0);
    let started = Instant::now();

    let attempted = run_with_retry(&policy, "flaky", |attempt| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt == 1 {
                Err(anyhow!("ftp hiccup"))
            } else {
                Ok(())
            }
        }
    })
    .await;

    assert_eq!(attempted.outcome, TaskOutcome::Success);
    assert_eq!(attempted.attempts, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(started.elapsed() >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn zero_max_attempts_means_no_retry() {
    init_tracing();

    let policy = RetryPolicy::default();
    let calls = AtomicU32::new(0);

    let attempted = run_with_retry(&policy, "once", |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(anyhow!("nope")) }
    })
    .await;

    assert_eq!(attempted.outcome, TaskOutcome::Failed);
    assert_eq!(attempted.attempts, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausting_attempts_fails() {
    init_tracing();

    let policy = RetryPolicy::new(3, Duration::from_secs(5));
    let started = Instant::now();

    let attempted = run_with_retry(&policy, "broken", |_| async { Err::<(), _>(anyhow!("down")) }).await;

    assert_eq!(attempted.outcome, TaskOutcome::Failed);
    // First attempt plus three retries, with a wait before each retry.
    assert_eq!(attempted.attempts, 4);
    assert!(started.elapsed() >= Duration::from_secs(15));
    assert!(started.elapsed() < Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn one_retry_means_two_invocations() {
    init_tracing();

    let policy = RetryPolicy::new(1, Duration::from_secs(1));
    let calls = AtomicU32::new(0);

    let attempted = run_with_retry(&policy, "broken", |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err::<(), _>(anyhow!("down")) }
    })
    .await;

    assert_eq!(attempted.outcome, TaskOutcome::Failed);
    assert_eq!(attempted.attempts, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn slow_attempts_hit_the_attempt_timeout() {
    init_tracing();

    let policy =
        RetryPolicy::new(2, Duration::from_secs(1)).with_attempt_timeout(Duration::from_secs(10));

    let attempted = run_with_retry(&policy, "slow", |_| async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok::<_, anyhow::Error>(())
    })
    .await;

    assert_eq!(attempted.outcome, TaskOutcome::Failed);
    assert_eq!(attempted.attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn runtime_applies_the_task_retry_policy() {
    init_tracing();

    let flaky = ScriptedOperator::from_results([false]).into_arc();
    let after = ScriptedOperator::succeeding().into_arc();

    let mut graph = DagGraph::new();
    graph
        .add_task(
            Task::new("flaky", flaky.clone())
                .with_retry_policy(RetryPolicy::new(2, Duration::from_secs(300))),
            NO_UPSTREAM,
        )
        .unwrap();
    graph.add_task(Task::new("after", after.clone()), ["flaky"]).unwrap();

    let (tx, rx) = mpsc::channel::<TaskCompletion>(16);
    let mut runtime = Runtime::new(
        Scheduler::new(Arc::new(graph)),
        rx,
        PoolExecutorBackend::new(tx, 1),
    );

    let report = runtime.run_once(logical_time()).await.unwrap();

    assert_eq!(report.outcome_of("flaky"), Some(Outcome::Success));
    assert_eq!(report.outcome_of("after"), Some(Outcome::Success));
    assert_eq!(flaky.calls(), 2);
    assert_eq!(after.calls(), 1);
}

#[tokio::test]
async fn panicking_operator_fails_its_task_and_the_run_completes() {
    init_tracing();

    let bad = ScriptedOperator::succeeding().panicking_on(1).into_arc();
    let after = ScriptedOperator::succeeding().into_arc();
    let fallback = ScriptedOperator::succeeding().into_arc();

    let mut graph = DagGraph::new();
    graph.add_task(Task::new("bad", bad.clone()), NO_UPSTREAM).unwrap();
    graph.add_task(Task::new("after", after.clone()), ["bad"]).unwrap();
    graph
        .add_task(
            Task::new("fallback", fallback.clone()).with_trigger_rule(TriggerRule::AllFailed),
            ["bad"],
        )
        .unwrap();

    let (tx, rx) = mpsc::channel::<TaskCompletion>(16);
    let mut runtime = Runtime::new(
        Scheduler::new(Arc::new(graph)),
        rx,
        PoolExecutorBackend::new(tx, 1),
    );

    let report = with_timeout(runtime.run_once(logical_time())).await.unwrap();

    assert_eq!(report.outcome_of("bad"), Some(Outcome::Failed));
    assert_eq!(report.outcome_of("after"), Some(Outcome::UpstreamFailed));
    assert_eq!(report.outcome_of("fallback"), Some(Outcome::Success));
    assert_eq!(bad.calls(), 1);
    assert_eq!(after.calls(), 0);
}

#[tokio::test]
async fn panic_is_retried_like_any_other_failure() {
    init_tracing();

    let flaky = ScriptedOperator::succeeding().panicking_on(1).into_arc();

    let mut graph = DagGraph::new();
    graph
        .add_task(
            Task::new("flaky", flaky.clone())
                .with_retry_policy(RetryPolicy::new(1, Duration::from_millis(10))),
            NO_UPSTREAM,
        )
        .unwrap();

    let (tx, rx) = mpsc::channel::<TaskCompletion>(16);
    let mut runtime = Runtime::new(
        Scheduler::new(Arc::new(graph)),
        rx,
        PoolExecutorBackend::new(tx, 1),
    );

    let report = with_timeout(runtime.run_once(logical_time())).await.unwrap();

    assert_eq!(report.outcome_of("flaky"), Some(Outcome::Success));
    assert_eq!(flaky.calls(), 2);
}
