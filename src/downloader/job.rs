//! Export run status and counters

use crate::resume::RunMode;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Phase of the export state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportPhase {
    /// Loading state and building the dedup index
    #[default]
    Start,
    /// Fetching and writing pages
    Paging,
    /// Sleeping after a full batch
    Cooldown,
    /// Pass exhausted, state finalized
    Done,
    /// Aborted on an unrecoverable error
    Failed,
}

impl fmt::Display for ExportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExportPhase::Start => "START",
            ExportPhase::Paging => "PAGING",
            ExportPhase::Cooldown => "COOLDOWN",
            ExportPhase::Done => "DONE",
            ExportPhase::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

/// Running counters for one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportProgress {
    /// Pages fetched
    pub pages: u64,
    /// Records seen, duplicates included
    pub processed: u64,
    /// Records appended to the sink
    pub new_records: u64,
    /// Records dropped because they were already exported
    pub duplicates: u64,
}

impl ExportProgress {
    /// Account for one processed page
    pub fn record_page(&mut self, new_records: u64, duplicates: u64) {
        self.pages += 1;
        self.new_records += new_records;
        self.duplicates += duplicates;
        self.processed += new_records + duplicates;
    }
}

/// Result of a completed export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSummary {
    /// How the run started
    pub mode: RunMode,
    /// Output file written to
    pub output_path: PathBuf,
    /// Pages fetched
    pub pages: u64,
    /// Records seen, duplicates included
    pub processed: u64,
    /// Records appended to the sink
    pub new_records: u64,
    /// Records dropped as duplicates
    pub duplicates: u64,
    /// Identifiers already in the sink before the run
    pub previously_exported: usize,
    /// Watermark written on completion (incremental mode only)
    pub watermark_written: Option<i64>,
    /// Run duration in milliseconds
    pub duration_ms: u64,
}

impl ExportSummary {
    /// Assemble a summary from the final counters
    pub fn from_progress(
        mode: RunMode,
        output_path: PathBuf,
        progress: &ExportProgress,
        previously_exported: usize,
        watermark_written: Option<i64>,
        duration_ms: u64,
    ) -> Self {
        Self {
            mode,
            output_path,
            pages: progress.pages,
            processed: progress.processed,
            new_records: progress.new_records,
            duplicates: progress.duplicates,
            previously_exported,
            watermark_written,
            duration_ms,
        }
    }
}
