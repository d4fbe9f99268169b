// src/frame.rs

//! Normalized time-series records.
//!
//! A [`Frame`] is a table of optional numeric measurements indexed by UTC
//! timestamp. It is what the encoder produces from a raw measurement file,
//! what the store holds on disk, and what projections hand downstream.
//! The JSON layout mirrors a column/index/data split:
//!
//! ```json
//! {"columns": ["TT002_M10"], "index": ["2017-08-25T00:10:00Z"], "data": [[13.2]]}
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{PolldagError, Result};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    pub columns: Vec<String>,
    /// Strictly increasing timestamps, one per row.
    pub index: Vec<DateTime<Utc>>,
    /// Row-major values; `None` marks a missing measurement.
    pub data: Vec<Vec<Option<f64>>>,
}

/// Layout of a raw whitespace-separated measurement file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiFormat {
    /// chrono format of the timestamp at the start of each row. A format
    /// containing spaces spans that many leading columns.
    pub timestamp_format: String,
    /// Tokens that stand for a missing measurement.
    pub missing_values: Vec<String>,
}

impl Default for AsciiFormat {
    fn default() -> Self {
        Self {
            timestamp_format: "%Y-%m-%d %H:%M:%S".to_string(),
            missing_values: vec!["NaN".to_string(), "-999".to_string(), "-999.0".to_string()],
        }
    }
}

impl Frame {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn newest(&self) -> Option<DateTime<Utc>> {
        self.index.last().copied()
    }

    /// Values of one column, in index order.
    pub fn column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let pos = self.columns.iter().position(|c| c == name)?;
        Some(self.data.iter().map(|row| row[pos]).collect())
    }

    /// Parse a raw measurement table.
    ///
    /// Blank lines and lines starting with `#` are ignored. The first
    /// remaining line is the header; its leading names label the timestamp
    /// columns and are dropped. Rows with a repeated timestamp replace the
    /// earlier row.
    pub fn parse_ascii(text: &str, format: &AsciiFormat) -> Result<Frame> {
        let ts_parts = format.timestamp_format.split_whitespace().count().max(1);

        let mut lines = text
            .lines()
            .enumerate()
            .map(|(n, line)| (n + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        let (_, header) = lines
            .next()
            .ok_or_else(|| PolldagError::DataError("measurement file has no header".to_string()))?;
        let names: Vec<&str> = header.split_whitespace().collect();
        if names.len() <= ts_parts {
            return Err(PolldagError::DataError(format!(
                "header has no measurement columns: '{}'",
                header
            )));
        }
        let columns: Vec<String> = names[ts_parts..].iter().map(|s| s.to_string()).collect();
        check_columns(&columns)?;

        let mut rows: BTreeMap<DateTime<Utc>, Vec<Option<f64>>> = BTreeMap::new();
        for (lineno, line) in lines {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() != names.len() {
                return Err(PolldagError::DataError(format!(
                    "line {}: expected {} fields, found {}",
                    lineno,
                    names.len(),
                    tokens.len()
                )));
            }

            let stamp = tokens[..ts_parts].join(" ");
            let ts = NaiveDateTime::parse_from_str(&stamp, &format.timestamp_format)
                .map_err(|e| {
                    PolldagError::DataError(format!("line {}: bad timestamp '{}': {}", lineno, stamp, e))
                })?
                .and_utc();

            let values = tokens[ts_parts..]
                .iter()
                .map(|tok| {
                    if format.missing_values.iter().any(|m| m == tok) {
                        None
                    } else {
                        tok.parse::<f64>().ok().filter(|v| v.is_finite())
                    }
                })
                .collect();
            rows.insert(ts, values);
        }

        Ok(Frame::from_rows(columns, rows))
    }

    pub fn from_json(text: &str) -> Result<Frame> {
        let frame: Frame = serde_json::from_str(text)?;
        frame.check_shape()?;
        Ok(frame)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Combine with a newer frame.
    ///
    /// Columns are the union (existing order first); rows are sorted by
    /// time and a timestamp present in both frames takes the newer row.
    pub fn merge(&self, newer: &Frame) -> Frame {
        let mut columns = self.columns.clone();
        for c in &newer.columns {
            if !columns.contains(c) {
                columns.push(c.clone());
            }
        }

        let mut rows: BTreeMap<DateTime<Utc>, HashMap<&str, Option<f64>>> = BTreeMap::new();
        for frame in [self, newer] {
            for (ts, row) in frame.index.iter().zip(&frame.data) {
                let values = frame
                    .columns
                    .iter()
                    .map(|c| c.as_str())
                    .zip(row.iter().copied())
                    .collect();
                rows.insert(*ts, values);
            }
        }

        let rows = rows
            .into_iter()
            .map(|(ts, values)| {
                let row = columns
                    .iter()
                    .map(|c| values.get(c.as_str()).copied().flatten())
                    .collect();
                (ts, row)
            })
            .collect();

        Frame::from_rows(columns, rows)
    }

    /// Drop rows older than `newest - bound`. A bound reaching past the
    /// representable time range keeps every row.
    pub fn truncate_to(&mut self, bound: Duration) {
        let Some(cutoff) = self.newest().and_then(|newest| newest.checked_sub_signed(bound)) else {
            return;
        };
        let keep_from = self.index.partition_point(|ts| *ts < cutoff);
        self.index.drain(..keep_from);
        self.data.drain(..keep_from);
    }

    /// A frame holding only `columns`, in the requested order.
    pub fn select(&self, columns: &[String]) -> Result<Frame> {
        let positions = columns
            .iter()
            .map(|c| {
                self.columns
                    .iter()
                    .position(|have| have == c)
                    .ok_or_else(|| PolldagError::DataError(format!("unknown column '{}'", c)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Frame {
            columns: columns.to_vec(),
            index: self.index.clone(),
            data: self
                .data
                .iter()
                .map(|row| positions.iter().map(|p| row[*p]).collect())
                .collect(),
        })
    }

    fn from_rows(columns: Vec<String>, rows: BTreeMap<DateTime<Utc>, Vec<Option<f64>>>) -> Frame {
        let (index, data) = rows.into_iter().unzip();
        Frame {
            columns,
            index,
            data,
        }
    }

    fn check_shape(&self) -> Result<()> {
        check_columns(&self.columns)?;
        if self.index.len() != self.data.len() {
            return Err(PolldagError::DataError(format!(
                "frame has {} timestamps but {} rows",
                self.index.len(),
                self.data.len()
            )));
        }
        if let Some(bad) = self.data.iter().position(|row| row.len() != self.columns.len()) {
            return Err(PolldagError::DataError(format!(
                "row {} has {} values for {} columns",
                bad,
                self.data[bad].len(),
                self.columns.len()
            )));
        }
        if self.index.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PolldagError::DataError(
                "frame index is not strictly increasing".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_columns(columns: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    match columns.iter().find(|c| !seen.insert(c.as_str())) {
        Some(dup) => Err(PolldagError::DataError(format!("duplicate column '{}'", dup))),
        None => Ok(()),
    }
}
