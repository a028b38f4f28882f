//! Periodic progress reporting for long-running exports.
//!
//! The upstream never reveals how many users exist, so progress is reported as
//! running totals and a throughput figure rather than a percentage.

use super::job::ExportProgress;
use std::time::{Duration, Instant};

const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_PAGE_STEP: u64 = 50;

/// Controls progress cadence: every `update_interval`, or every `page_step` pages,
/// whichever comes first.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    update_interval: Duration,
    page_step: u64,
}

impl ProgressTracker {
    /// Create a tracker with a custom cadence
    pub fn new(update_interval: Duration, page_step: u64) -> Self {
        Self {
            update_interval,
            page_step: page_step.max(1),
        }
    }

    /// Build a fresh [`ProgressState`]
    pub fn create_state(&self) -> ProgressState {
        let now = Instant::now();
        ProgressState {
            start_time: now,
            last_update: now,
            last_reported_pages: 0,
            update_interval: self.update_interval,
            page_step: self.page_step,
            current_rate: 0.0,
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(DEFAULT_UPDATE_INTERVAL, DEFAULT_PAGE_STEP)
    }
}

/// Emission bookkeeping for one run
#[derive(Debug, Clone)]
pub struct ProgressState {
    start_time: Instant,
    last_update: Instant,
    last_reported_pages: u64,
    update_interval: Duration,
    page_step: u64,
    current_rate: f64,
}

impl ProgressState {
    /// Refresh throughput from the latest counters
    pub fn update(&mut self, progress: &ExportProgress) {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.current_rate = progress.processed as f64 / elapsed;
        }
    }

    /// Whether a progress line is due
    pub fn should_emit_update(&self, progress: &ExportProgress) -> bool {
        if progress.pages == 0 {
            return false;
        }
        progress.pages - self.last_reported_pages >= self.page_step
            || self.last_update.elapsed() >= self.update_interval
    }

    /// Call after logging a progress line
    pub fn mark_emitted(&mut self, progress: &ExportProgress) {
        self.last_update = Instant::now();
        self.last_reported_pages = progress.pages;
    }

    /// Human-readable progress line
    pub fn format_progress(&self, progress: &ExportProgress) -> String {
        let mut line = format!(
            "[PROGRESS] {} pages, {} users processed ({} new, {} duplicates)",
            progress.pages, progress.processed, progress.new_records, progress.duplicates
        );
        if self.current_rate > 0.0 {
            line.push_str(&format!(" at {:.1} users/sec", self.current_rate));
        }
        line.push_str(&format!(
            " - running for {}",
            format_duration(self.start_time.elapsed())
        ));
        line
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        format!("{:.1}h", secs as f64 / 3600.0)
    }
}
