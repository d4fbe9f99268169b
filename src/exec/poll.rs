// src/exec/poll.rs

//! Polling primitive behind sensor-style tasks.
//!
//! A poll checks a condition right away and then once per interval until the
//! condition holds or the timeout has been exceeded. Check errors are read as
//! "not ready yet"; only a run of consecutive errors beyond the configured
//! limit makes the poll give up early.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::engine::TaskOutcome;
use crate::errors::{PolldagError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Satisfied,
    TimedOut,
}

impl PollOutcome {
    pub fn task_outcome(self) -> TaskOutcome {
        match self {
            PollOutcome::Satisfied => TaskOutcome::Success,
            PollOutcome::TimedOut => TaskOutcome::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    pub outcome: PollOutcome,
    /// Number of times the check was invoked.
    pub checks: u32,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poller {
    interval: Duration,
    timeout: Duration,
    max_consecutive_errors: Option<u32>,
}

impl Poller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            max_consecutive_errors: None,
        }
    }

    /// Give up once more than `limit` checks in a row returned an error.
    pub fn with_max_consecutive_errors(mut self, limit: u32) -> Self {
        self.max_consecutive_errors = Some(limit);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn poll<F, Fut>(&self, mut check: F) -> Result<PollReport>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<bool>>,
    {
        let started = Instant::now();
        let mut checks = 0u32;
        let mut consecutive_errors = 0u32;

        loop {
            checks += 1;

            match check().await {
                Ok(true) => {
                    let elapsed = started.elapsed();
                    debug!(checks, ?elapsed, "poll satisfied");
                    return Ok(PollReport {
                        outcome: PollOutcome::Satisfied,
                        checks,
                        elapsed,
                    });
                }
                Ok(false) => {
                    consecutive_errors = 0;
                    debug!(checks, "condition not met yet");
                }
                Err(err) => {
                    consecutive_errors += 1;
                    if let Some(limit) = self.max_consecutive_errors {
                        if consecutive_errors > limit {
                            return Err(PolldagError::SensorUnreachable {
                                errors: consecutive_errors,
                                last_error: format!("{err:#}"),
                            });
                        }
                    }
                    warn!(
                        checks,
                        consecutive_errors,
                        error = %format!("{err:#}"),
                        "check failed; treating as not ready"
                    );
                }
            }

            let elapsed = started.elapsed();
            if elapsed > self.timeout {
                debug!(checks, ?elapsed, timeout = ?self.timeout, "poll timed out");
                return Ok(PollReport {
                    outcome: PollOutcome::TimedOut,
                    checks,
                    elapsed,
                });
            }

            sleep(self.interval).await;
        }
    }
}
