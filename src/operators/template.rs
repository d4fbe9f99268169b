// src/operators/template.rs

use std::fmt;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};

use crate::errors::{PolldagError, Result};

/// A chrono strftime pattern, checked when constructed so rendering can
/// never fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template(String);

impl Template {
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            return Err(PolldagError::ConfigError(format!(
                "invalid time template '{}'",
                pattern
            )));
        }
        Ok(Self(pattern))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn render(&self, time: DateTime<Utc>) -> String {
        time.format(&self.0).to_string()
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
