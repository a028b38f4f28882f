//! Steady-state pacing and batch cooldown
//!
//! Two sleeps independent of backoff: a fixed delay after every successful
//! request, and a longer cooldown after each batch of newly exported records.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

/// Minimum spacing between successful requests
#[derive(Debug, Clone, Copy)]
pub struct RequestPacer {
    interval: Duration,
}

impl RequestPacer {
    /// Create a pacer sleeping `interval` after each success
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Pacing interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep the pacing interval. Called unconditionally after every success.
    pub async fn pace(&self) {
        if self.interval.is_zero() {
            return;
        }
        debug!(pacing_ms = self.interval.as_millis() as u64, "Pacing before next request");
        sleep(self.interval).await;
    }
}

/// Counts new records and signals when a cooldown is due
#[derive(Debug, Clone)]
pub struct BatchCooldown {
    batch_size: u64,
    cooldown: Duration,
    since_last: u64,
    cooldowns: u64,
}

impl BatchCooldown {
    /// Cool down for `cooldown` after every `batch_size` new records
    pub fn new(batch_size: u64, cooldown: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            cooldown,
            since_last: 0,
            cooldowns: 0,
        }
    }

    /// Account for `new_records` freshly exported records
    pub fn record(&mut self, new_records: u64) {
        self.since_last += new_records;
    }

    /// Whether a full batch has accumulated since the last cooldown
    pub fn is_due(&self) -> bool {
        self.since_last >= self.batch_size
    }

    /// Sleep if a cooldown is due. Returns whether it slept.
    pub async fn cool_down_if_due(&mut self) -> bool {
        if !self.is_due() {
            return false;
        }
        info!(
            new_since_last_cooldown = self.since_last,
            cooldown_ms = self.cooldown.as_millis() as u64,
            "Batch complete, cooling down"
        );
        self.since_last = 0;
        self.cooldowns += 1;
        sleep(self.cooldown).await;
        true
    }

    /// Cooldowns taken so far
    pub fn cooldowns(&self) -> u64 {
        self.cooldowns
    }
}
