//! Checkpoint values persisted between runs
//!
//! A [`Cursor`] marks the position inside an unfinished pass, a [`Watermark`]
//! marks the start time of the last finished one.

use super::state::ResumeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque upstream pagination token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap a token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Build a cursor from a stored or upstream value.
    ///
    /// Blank values mean "no cursor".
    pub fn from_stored(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Token as sent upstream
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Start time (Unix seconds) of the last completed pass.
///
/// Records created at or before this instant were already exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watermark(i64);

impl Watermark {
    /// Create from Unix seconds
    pub fn from_unix_seconds(seconds: i64) -> Self {
        Self(seconds)
    }

    /// Unix seconds
    pub fn unix_seconds(self) -> i64 {
        self.0
    }

    /// Parse a stored watermark. Blank values mean "no watermark".
    pub fn from_stored(value: &str) -> Result<Option<Self>, ResumeError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        trimmed
            .parse::<i64>()
            .map(|seconds| Some(Self(seconds)))
            .map_err(|e| {
                ResumeError::InvalidState(format!("watermark '{trimmed}' is not an integer: {e}"))
            })
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
