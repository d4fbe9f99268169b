// src/dag/trigger_rule.rs

//! Trigger rule evaluation.
//!
//! The evaluator only ever sees terminal upstream outcomes: the scheduler
//! consults it once every upstream of a task has finished.

use crate::dag::task::Outcome;
use crate::types::TriggerRule;

/// What the scheduler should do with a task whose upstreams are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerDecision {
    /// Execute the task's operator.
    Run,
    /// Mark the task `Skipped` without executing it.
    Skip,
    /// Mark the task `UpstreamFailed` without executing it.
    UpstreamFail,
}

/// Decide whether a task with `rule` runs given its upstream outcomes.
///
/// A task without upstreams always runs.
pub fn evaluate(rule: TriggerRule, upstream: &[Outcome]) -> TriggerDecision {
    if upstream.is_empty() {
        return TriggerDecision::Run;
    }

    let count = |wanted: Outcome| upstream.iter().filter(|o| **o == wanted).count();
    let success = count(Outcome::Success);
    let failed = count(Outcome::Failed);
    let skipped = count(Outcome::Skipped);
    let upstream_failed = count(Outcome::UpstreamFailed);
    let total = upstream.len();

    match rule {
        TriggerRule::AllSuccess => {
            if failed + upstream_failed > 0 {
                TriggerDecision::UpstreamFail
            } else if skipped > 0 {
                TriggerDecision::Skip
            } else {
                TriggerDecision::Run
            }
        }
        TriggerRule::AllFailed => {
            if failed == total {
                TriggerDecision::Run
            } else if success > 0 {
                TriggerDecision::Skip
            } else if upstream_failed > 0 {
                TriggerDecision::UpstreamFail
            } else {
                TriggerDecision::Skip
            }
        }
        TriggerRule::OneSuccess => {
            if success > 0 {
                TriggerDecision::Run
            } else if skipped == 0 {
                // Every upstream failed one way or another.
                TriggerDecision::UpstreamFail
            } else {
                TriggerDecision::Skip
            }
        }
    }
}
