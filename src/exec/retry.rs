// src/exec/retry.rs

//! Bounded retries with a fixed delay between attempts.

use std::future::Future;
use std::time::Duration;

use anyhow::anyhow;
use tokio::sync::Semaphore;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

use crate::engine::TaskOutcome;

/// How often and how patiently a task's operator is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `0` means the operator runs once.
    pub max_attempts: u32,
    /// Wait between a failed attempt and the next one.
    pub delay: Duration,
    /// Upper bound for one attempt; an attempt that exceeds it fails.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            delay: Duration::from_secs(5 * 60),
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            attempt_timeout: None,
        }
    }

    pub fn with_attempt_timeout(mut self, limit: Duration) -> Self {
        self.attempt_timeout = Some(limit);
        self
    }

    /// Total number of invocations the policy allows.
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.saturating_add(1)
    }
}

/// Final result of [`run_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempted {
    pub outcome: TaskOutcome,
    pub attempts: u32,
}

/// Invoke `attempt` until it succeeds or the policy runs out of attempts.
///
/// The closure receives the 1-based attempt number.
pub async fn run_with_retry<F, Fut>(policy: &RetryPolicy, task: &str, attempt: F) -> Attempted
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    retry_loop(policy, task, None, attempt).await
}

/// Like [`run_with_retry`], but each attempt holds a permit of `slots` while
/// it executes. The permit is released before the retry delay.
pub async fn run_with_retry_in_pool<F, Fut>(
    policy: &RetryPolicy,
    task: &str,
    slots: &Semaphore,
    attempt: F,
) -> Attempted
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    retry_loop(policy, task, Some(slots), attempt).await
}

async fn retry_loop<F, Fut>(
    policy: &RetryPolicy,
    task: &str,
    slots: Option<&Semaphore>,
    mut attempt: F,
) -> Attempted
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let max_attempts = policy.effective_attempts();
    let mut n = 0;

    loop {
        n += 1;

        let permit = match slots {
            Some(slots) => match slots.acquire().await {
                Ok(permit) => {
                    debug!(task = %task, attempt = n, "worker acquired");
                    Some(permit)
                }
                Err(_) => {
                    error!(task = %task, attempt = n, "worker pool closed; task not run");
                    return Attempted {
                        outcome: TaskOutcome::Failed,
                        attempts: n - 1,
                    };
                }
            },
            None => None,
        };

        let result = match policy.attempt_timeout {
            Some(limit) => match timeout(limit, attempt(n)).await {
                Ok(result) => result,
                Err(_) => Err(anyhow!("attempt timed out after {limit:?}")),
            },
            None => attempt(n).await,
        };
        drop(permit);

        match result {
            Ok(()) => {
                return Attempted {
                    outcome: TaskOutcome::Success,
                    attempts: n,
                };
            }
            Err(err) if n < max_attempts => {
                warn!(
                    task = %task,
                    attempt = n,
                    max_attempts,
                    delay = ?policy.delay,
                    error = %format!("{err:#}"),
                    "attempt failed; retrying"
                );
                sleep(policy.delay).await;
            }
            Err(err) => {
                error!(
                    task = %task,
                    attempt = n,
                    max_attempts,
                    error = %format!("{err:#}"),
                    "attempt failed; no attempts left"
                );
                return Attempted {
                    outcome: TaskOutcome::Failed,
                    attempts: n,
                };
            }
        }
    }
}
