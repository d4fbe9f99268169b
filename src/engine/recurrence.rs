// src/engine/recurrence.rs

//! Fixed-interval recurrence of DAG runs.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::errors::{PolldagError, Result};
use crate::exec::ExecutorBackend;

use super::Runtime;

/// Start a fresh run every `interval` until `shutdown` resolves.
///
/// The first run starts immediately. A run that overruns the interval delays
/// the next one instead of queueing missed ticks. A deadlocked run is logged
/// and the next cycle starts normally; any other error ends the loop.
///
/// Returns the number of runs that completed.
pub async fn run_forever<E, S>(
    runtime: &mut Runtime<E>,
    interval: Duration,
    shutdown: S,
) -> Result<u64>
where
    E: ExecutorBackend,
    S: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut completed = 0u64;
    info!(?interval, "recurring runs started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => {
                info!("shutdown requested; stopping recurring runs");
                break;
            }
        }

        tokio::select! {
            result = runtime.run_once(Utc::now()) => match result {
                Ok(_report) => completed += 1,
                Err(err @ PolldagError::Deadlock { .. }) => {
                    error!(error = %err, "run aborted");
                }
                Err(err) => return Err(err),
            },
            _ = &mut shutdown => {
                warn!("shutdown requested while a run was in progress");
                break;
            }
        }
    }

    Ok(completed)
}
