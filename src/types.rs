use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Predicate over a task's upstream outcomes deciding whether it runs.
///
/// - `AllSuccess`: run only when every upstream succeeded (default).
/// - `AllFailed`: run only when every upstream failed. Used for fallback
///   branches that should act when the primary path did not work.
/// - `OneSuccess`: run as soon as any upstream succeeded. Used to join an
///   either/or pair of branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerRule {
    AllSuccess,
    AllFailed,
    OneSuccess,
}

impl Default for TriggerRule {
    fn default() -> Self {
        TriggerRule::AllSuccess
    }
}

impl FromStr for TriggerRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all_success" => Ok(TriggerRule::AllSuccess),
            "all_failed" => Ok(TriggerRule::AllFailed),
            "one_success" => Ok(TriggerRule::OneSuccess),
            other => Err(format!(
                "invalid trigger_rule: {other} (expected \"all_success\", \"all_failed\" or \"one_success\")"
            )),
        }
    }
}

impl fmt::Display for TriggerRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerRule::AllSuccess => write!(f, "all_success"),
            TriggerRule::AllFailed => write!(f, "all_failed"),
            TriggerRule::OneSuccess => write!(f, "one_success"),
        }
    }
}
