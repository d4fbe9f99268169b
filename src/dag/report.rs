// src/dag/report.rs

//! Final report of a DAG run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::dag::task::Outcome;
use crate::engine::TaskName;

/// Terminal outcome of every task of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: u64,
    pub logical_time: DateTime<Utc>,
    pub outcomes: BTreeMap<TaskName, Outcome>,
    /// Tasks nothing depends on.
    pub leaves: Vec<TaskName>,
}

impl RunReport {
    pub fn outcome_of(&self, task: &str) -> Option<Outcome> {
        self.outcomes.get(task).copied()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.values().filter(|o| **o == outcome).count()
    }

    /// Leaves that neither succeeded nor were deliberately skipped.
    pub fn failed_leaves(&self) -> Vec<&str> {
        self.leaves
            .iter()
            .filter(|leaf| {
                !matches!(
                    self.outcomes.get(leaf.as_str()),
                    Some(Outcome::Success) | Some(Outcome::Skipped)
                )
            })
            .map(|s| s.as_str())
            .collect()
    }

    /// A run succeeds when no failure reached a leaf. Failures absorbed by
    /// an `all_failed` or `one_success` join do not count.
    pub fn is_success(&self) -> bool {
        self.failed_leaves().is_empty()
    }

    pub fn log_summary(&self) {
        info!(
            run_id = self.run_id,
            logical_time = %self.logical_time,
            success = self.is_success(),
            succeeded = self.count(Outcome::Success),
            failed = self.count(Outcome::Failed),
            skipped = self.count(Outcome::Skipped),
            upstream_failed = self.count(Outcome::UpstreamFailed),
            "run finished"
        );

        for leaf in self.failed_leaves() {
            let outcome = self
                .outcome_of(leaf)
                .map(|o| o.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            warn!(run_id = self.run_id, task = %leaf, %outcome, "leaf task did not succeed");
        }
    }
}
