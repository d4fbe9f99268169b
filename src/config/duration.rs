// src/config/duration.rs

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::errors::{PolldagError, Result};

/// Parse durations such as `"250ms"`, `"10s"`, `"15m"`, `"2h"` or `"7d"`.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(PolldagError::ConfigError("empty duration string".to_string()));
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| {
            PolldagError::ConfigError(format!("duration '{}' is missing a unit suffix", s))
        })?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part.parse().map_err(|e| {
        PolldagError::ConfigError(format!("invalid duration number '{}': {}", num_part, e))
    })?;

    let secs = |factor: u64| {
        value
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| PolldagError::ConfigError(format!("duration '{}' is too large", s)))
    };

    match unit_part.trim().to_lowercase().as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => secs(1),
        "m" => secs(60),
        "h" => secs(60 * 60),
        "d" => secs(24 * 60 * 60),
        unit => Err(PolldagError::ConfigError(format!(
            "unsupported duration unit '{}'; expected ms, s, m, h or d",
            unit
        ))),
    }
}

/// Parse a history bound for time-series data.
///
/// Rejects bounds that reach past the range of representable timestamps.
pub fn parse_time_bound(s: &str) -> Result<chrono::Duration> {
    let out_of_range = || PolldagError::ConfigError(format!("time bound '{}' is out of range", s));
    let bound = chrono::Duration::from_std(parse_duration(s)?).map_err(|_| out_of_range())?;
    DateTime::<Utc>::UNIX_EPOCH
        .checked_sub_signed(bound)
        .ok_or_else(out_of_range)?;
    Ok(bound)
}
