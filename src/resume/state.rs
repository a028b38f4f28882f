//! Run state: which kind of pass an invocation performs
//!
//! The pair (cursor, watermark) read at startup decides between a cold start,
//! resuming an interrupted pass, or an incremental pass. Checkpoint writes and
//! pass completion go through the same type so the ordering rules live in one
//! place.

use super::checkpoint::{Cursor, Watermark};
use super::store::{StateKey, StateStore};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// How a run begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// No cursor and no usable watermark: fetch everything
    ColdStart,
    /// A cursor from an interrupted pass exists: continue that pass
    Resuming,
    /// No cursor, watermark present and incremental mode on
    Incremental,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunMode::ColdStart => "cold start",
            RunMode::Resuming => "resuming",
            RunMode::Incremental => "incremental",
        };
        write!(f, "{s}")
    }
}

/// State loaded at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    mode: RunMode,
    cursor: Option<Cursor>,
    watermark: Option<Watermark>,
}

impl RunState {
    /// Read the cursor and, when relevant, the watermark from `store`.
    ///
    /// The watermark is only consulted when no cursor is present and
    /// `incremental` is on: a resumed pass was already filtered when it began.
    pub fn load(store: &dyn StateStore, incremental: bool) -> Result<Self, ResumeError> {
        let cursor = store
            .load(StateKey::Cursor)?
            .and_then(|value| Cursor::from_stored(&value));

        if let Some(cursor) = cursor {
            info!(cursor = %cursor, "Found cursor from an interrupted run, resuming");
            return Ok(Self {
                mode: RunMode::Resuming,
                cursor: Some(cursor),
                watermark: None,
            });
        }

        if incremental {
            let watermark = match store.load(StateKey::Watermark)? {
                Some(value) => Watermark::from_stored(&value)?,
                None => None,
            };
            if let Some(watermark) = watermark {
                info!(watermark = %watermark, "Incremental run from watermark");
                return Ok(Self {
                    mode: RunMode::Incremental,
                    cursor: None,
                    watermark: Some(watermark),
                });
            }
            debug!("Incremental mode enabled but no watermark stored yet");
        }

        info!("No resume state found, starting from the beginning");
        Ok(Self {
            mode: RunMode::ColdStart,
            cursor: None,
            watermark: None,
        })
    }

    /// Run mode
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Cursor to start from
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// Since-filter for the pass; only set for incremental runs
    pub fn since(&self) -> Option<Watermark> {
        self.watermark
    }
}

/// Persist the page checkpoint: the cursor to continue from, or nothing when
/// the pass is exhausted.
pub fn checkpoint_cursor(store: &dyn StateStore, cursor: Option<&Cursor>) -> Result<(), ResumeError> {
    match cursor {
        Some(cursor) => store.save(StateKey::Cursor, cursor.as_str()),
        None => store.clear(StateKey::Cursor),
    }
}

/// Finish a pass: retire the cursor and, in incremental mode, record the
/// watermark. The cursor goes first so a crash in between can only cause a
/// redundant (deduplicated) pass, never a skipped one.
pub fn complete_pass(
    store: &dyn StateStore,
    watermark: Option<Watermark>,
) -> Result<(), ResumeError> {
    store.clear(StateKey::Cursor)?;
    if let Some(watermark) = watermark {
        store.save(StateKey::Watermark, &watermark.to_string())?;
        info!(watermark = %watermark, "Watermark updated");
    }
    Ok(())
}

/// Errors related to cursor and watermark state
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    /// State file too large
    #[error("state file too large: {size} bytes (max: {max} bytes)")]
    StateTooLarge {
        /// Actual file size
        size: u64,
        /// Maximum allowed size
        max: u64,
    },

    /// Stored value cannot be interpreted
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),
}
