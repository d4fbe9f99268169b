pub mod builders;
pub mod recording_executor;
pub mod scripted;

use std::sync::Once;

use chrono::{DateTime, TimeZone, Utc};
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
///
/// Not for tests with a paused clock: auto-advance would fire the timeout
/// before any longer sleep in the code under test.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Logical time used by fixtures: Friday 2017-08-25 00:00 UTC, ISO week
/// 2017-W34.
pub fn logical_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 8, 25, 0, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}
