//! Export orchestration
//!
//! The driver pulls pages through a [`crate::fetcher::UserFetcher`], drops
//! identifiers already in the sink, appends the rest and checkpoints the cursor
//! after every page.
//!
//! # Components
//!
//! - [`executor`] - [`ExportDriver`], the pagination state machine
//! - [`backoff`] - Backoff controller and retry budgets
//! - [`pacing`] - Per-request pacing and batch cooldown
//! - [`config`] - Defaults and the [`ExportConfig`] driver context
//! - [`job`] - Phases, counters and the final [`ExportSummary`]
//! - [`progress`] - Periodic progress lines
//!
//! # Error Handling
//!
//! Every error aborts the run. Nothing already checkpointed is lost, so the
//! operator can re-run the same command to continue; see
//! [`ExportError::resume_hint`].

pub mod backoff;
pub mod config;
pub mod executor;
pub mod job;
pub mod pacing;
pub mod progress;

pub use backoff::{BackoffConfig, Retrier, RetryPolicy};
pub use config::ExportConfig;
pub use executor::ExportDriver;
pub use job::{ExportPhase, ExportProgress, ExportSummary};

use crate::fetcher::FetcherError;
use crate::output::OutputError;
use crate::resume::ResumeError;

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Fetching a page failed
    #[error("fetch failed: {0}")]
    Fetcher(#[from] FetcherError),

    /// Reading or writing cursor/watermark state failed
    #[error("state error: {0}")]
    State(#[from] ResumeError),

    /// Reading or writing the output file failed
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// Configuration rejected before the run started
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ExportError {
    /// Operator guidance printed next to the error
    pub fn resume_hint(&self) -> &'static str {
        match self {
            ExportError::InvalidConfig(_) => "Fix the configuration and run again.",
            ExportError::State(ResumeError::InvalidState(_) | ResumeError::StateTooLarge { .. }) => {
                "Repair or delete the offending state file, then run again."
            }
            _ => {
                "Progress is saved after every page. Re-run the same command to resume from the last checkpoint."
            }
        }
    }
}
