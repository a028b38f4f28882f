//! Export configuration constants and the driver context

use super::backoff::{BackoffConfig, RetryPolicy};
use std::time::Duration;

/// Maximum number of retries for transport-level network failures.
/// Rate-limit responses are not capped.
pub const MAX_NETWORK_RETRIES: u32 = 5;

/// Initial backoff delay in milliseconds
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum backoff delay in milliseconds
pub const MAX_BACKOFF_MS: u64 = 60_000;

/// Multiplier applied to the previous delay on each retry
pub const BACKOFF_FACTOR: f64 = 2.0;

/// Relative jitter applied to each grown delay (±10%)
pub const JITTER_FACTOR: f64 = 0.1;

/// New records exported between two batch cooldowns
pub const DEFAULT_BATCH_SIZE: u64 = 2500;

/// Batch cooldown in milliseconds
pub const DEFAULT_BATCH_COOLDOWN_MS: u64 = 10_000;

/// Minimum delay after every successful request, in milliseconds
pub const DEFAULT_RATE_LIMIT_MS: u64 = 500;

/// Upper bound on successful requests per minute
pub const DEFAULT_MAX_REQUESTS_PER_MINUTE: u32 = 60;

/// Driver context, built once at startup and threaded through every component
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// New records between two cooldowns
    pub batch_size: u64,
    /// Sleep applied after each full batch
    pub batch_cooldown: Duration,
    /// Minimum delay after each successful request
    pub rate_limit: Duration,
    /// Successful requests allowed per minute
    pub max_requests_per_minute: u32,
    /// Only fetch records newer than the stored watermark
    pub incremental: bool,
    /// Delay growth for retries
    pub backoff: BackoffConfig,
    /// Retry budget for 429 responses
    pub rate_limit_retries: RetryPolicy,
    /// Retry budget for network failures
    pub network_retries: RetryPolicy,
}

impl ExportConfig {
    /// Steady-state pacing interval: `max(rate_limit, 60s / max_requests_per_minute)`
    pub fn pacing_interval(&self) -> Duration {
        let per_request = Duration::from_millis(60_000 / u64::from(self.max_requests_per_minute.max(1)));
        self.rate_limit.max(per_request)
    }

    /// Enable or disable incremental mode
    pub fn with_incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    /// Validate values that would otherwise misbehave at runtime
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch size must be at least 1".to_string());
        }
        if self.max_requests_per_minute == 0 {
            return Err("max requests per minute must be at least 1".to_string());
        }
        self.backoff.validate()
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_cooldown: Duration::from_millis(DEFAULT_BATCH_COOLDOWN_MS),
            rate_limit: Duration::from_millis(DEFAULT_RATE_LIMIT_MS),
            max_requests_per_minute: DEFAULT_MAX_REQUESTS_PER_MINUTE,
            incremental: false,
            backoff: BackoffConfig::default(),
            rate_limit_retries: RetryPolicy::Unlimited,
            network_retries: RetryPolicy::Limited(MAX_NETWORK_RETRIES),
        }
    }
}
