// tests/sensor_poll.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use polldag::dag::{DagGraph, NO_UPSTREAM, Outcome, Scheduler, Task};
use polldag::engine::{Runtime, TaskCompletion, TaskOutcome};
use polldag::errors::PolldagError;
use polldag::exec::{PollOutcome, Poller, PoolExecutorBackend};
use polldag::fs::FileSystem;
use polldag::fs::mock::MockFileSystem;
use polldag::operators::{DirSource, FileSensor, Template};
use polldag_test_utils::{init_tracing, logical_time};
use tokio::sync::mpsc;

fn poller() -> Poller {
    Poller::new(Duration::from_secs(10), Duration::from_secs(120))
}

#[tokio::test(start_paused = true)]
async fn satisfied_on_third_check() {
    init_tracing();

    let calls = AtomicU32::new(0);
    let report = poller()
        .poll(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok::<_, anyhow::Error>(n >= 3) }
        })
        .await
        .unwrap();

    assert_eq!(report.outcome, PollOutcome::Satisfied);
    assert_eq!(report.outcome.task_outcome(), TaskOutcome::Success);
    assert!(report.checks >= 3);
    assert!(report.elapsed < Duration::from_secs(120));
    assert_eq!(report.elapsed, Duration::from_secs(20));
}

#[tokio::test(start_paused = true)]
async fn times_out_when_condition_never_holds() {
    init_tracing();

    let report = poller().poll(|| async { Ok::<_, anyhow::Error>(false) }).await.unwrap();

    assert_eq!(report.outcome, PollOutcome::TimedOut);
    assert_eq!(report.outcome.task_outcome(), TaskOutcome::Failed);
    assert!(report.elapsed > Duration::from_secs(120));
    // Immediate check plus one per interval until past the timeout.
    assert_eq!(report.checks, 14);
}

#[tokio::test(start_paused = true)]
async fn check_errors_count_as_not_ready() {
    init_tracing();

    let calls = AtomicU32::new(0);
    let report = poller()
        .poll(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                match n {
                    1 | 2 => Err(anyhow!("connection reset")),
                    _ => Ok(true),
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(report.outcome, PollOutcome::Satisfied);
    assert_eq!(report.checks, 3);
}

#[tokio::test(start_paused = true)]
async fn too_many_consecutive_errors_fail_fast() {
    init_tracing();

    let calls = AtomicU32::new(0);
    let err = poller()
        .with_max_consecutive_errors(2)
        .poll(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<bool, _>(anyhow!("host unreachable")) }
        })
        .await
        .unwrap_err();

    match err {
        PolldagError::SensorUnreachable { errors, last_error } => {
            assert_eq!(errors, 3);
            assert!(last_error.contains("host unreachable"));
        }
        other => panic!("expected SensorUnreachable, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn successful_check_resets_the_error_streak() {
    init_tracing();

    let calls = AtomicU32::new(0);
    let report = poller()
        .with_max_consecutive_errors(1)
        .poll(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                match n {
                    1 | 3 => Err(anyhow!("flaky")),
                    2 => Ok(false),
                    _ => Ok(true),
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(report.outcome, PollOutcome::Satisfied);
    assert_eq!(report.checks, 4);
}

/// A sensor task fails once its timeout passes and succeeds once the file is published.
#[tokio::test(start_paused = true)]
async fn file_sensor_waits_for_the_rendered_file() {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("/ftp/README", "mirror");
    let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());

    let sensor = FileSensor::new(
        Arc::new(DirSource::new("/ftp", shared)),
        Template::new("%G_W%V_MASTER_M10.txt").unwrap(),
        poller(),
    );

    let mut graph = DagGraph::new();
    graph.add_task(Task::new("sensor", Arc::new(sensor)), NO_UPSTREAM).unwrap();

    let (tx, rx) = mpsc::channel::<TaskCompletion>(16);
    let mut runtime = Runtime::new(
        Scheduler::new(Arc::new(graph)),
        rx,
        PoolExecutorBackend::new(tx, 1),
    );

    // Nothing published: the sensor gives up after its timeout.
    let report = runtime.run_once(logical_time()).await.unwrap();
    assert_eq!(report.outcome_of("sensor"), Some(Outcome::Failed));

    // 2017-08-25 is in ISO week 2017-W34.
    fs.add_file("/ftp/2017_W34_MASTER_M10.txt", "data");
    let report = runtime.run_once(logical_time()).await.unwrap();
    assert_eq!(report.outcome_of("sensor"), Some(Outcome::Success));
}
