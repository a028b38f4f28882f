//! Backoff controller and retry budget
//!
//! Delays start at a fixed base and then grow as
//! `min(max, previous * factor * jitter)` with
//! `jitter = 1 + uniform(-jitter_factor, +jitter_factor)`.
//!
//! Rate-limit responses and network failures share the same algorithm through
//! [`Retrier`], each with its own counter and [`RetryPolicy`].

use super::config::{BACKOFF_FACTOR, INITIAL_BACKOFF_MS, JITTER_FACTOR, MAX_BACKOFF_MS};
use rand::Rng;
use std::fmt;
use std::time::Duration;

/// Delay growth parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first retry
    pub initial: Duration,
    /// Growth multiplier
    pub factor: f64,
    /// Ceiling for any single delay
    pub max: Duration,
    /// Relative jitter amplitude, in `[0, 1)`
    pub jitter_factor: f64,
}

impl BackoffConfig {
    /// Delay before retry number `attempt` (1-based), given the delay used
    /// before the previous retry. Draws a fresh jitter sample.
    pub fn next_delay(&self, attempt: u32, previous: Option<Duration>) -> Duration {
        let sample = if self.jitter_factor > 0.0 {
            rand::rng().random_range(-self.jitter_factor..=self.jitter_factor)
        } else {
            0.0
        };
        self.next_delay_with_jitter(attempt, previous, sample)
    }

    /// Deterministic form of [`next_delay`](Self::next_delay). `jitter_sample`
    /// is clamped to `[-jitter_factor, +jitter_factor]`.
    pub fn next_delay_with_jitter(
        &self,
        attempt: u32,
        previous: Option<Duration>,
        jitter_sample: f64,
    ) -> Duration {
        let previous = match previous {
            Some(previous) if attempt > 1 => previous,
            _ => return self.initial.min(self.max),
        };

        let jitter = 1.0 + jitter_sample.clamp(-self.jitter_factor, self.jitter_factor);
        let grown_ms = previous.as_millis() as f64 * self.factor * jitter;
        let max_ms = self.max.as_millis() as f64;

        Duration::from_millis(grown_ms.min(max_ms).max(0.0) as u64)
    }

    /// Sanity checks for user-supplied values
    pub fn validate(&self) -> Result<(), String> {
        if self.factor < 1.0 {
            return Err(format!("backoff factor must be >= 1, got {}", self.factor));
        }
        if !(0.0..1.0).contains(&self.jitter_factor) {
            return Err(format!(
                "jitter factor must be in [0, 1), got {}",
                self.jitter_factor
            ));
        }
        if self.initial > self.max {
            return Err("initial backoff exceeds maximum backoff".to_string());
        }
        Ok(())
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(INITIAL_BACKOFF_MS),
            factor: BACKOFF_FACTOR,
            max: Duration::from_millis(MAX_BACKOFF_MS),
            jitter_factor: JITTER_FACTOR,
        }
    }
}

/// How many retries a failure class may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retry forever
    Unlimited,
    /// Retry at most this many times
    Limited(u32),
}

impl RetryPolicy {
    /// Whether retry number `attempt` (1-based) is allowed
    pub fn allows(&self, attempt: u32) -> bool {
        match self {
            RetryPolicy::Unlimited => true,
            RetryPolicy::Limited(max) => attempt <= *max,
        }
    }

    /// Configured maximum, if any
    pub fn max_retries(&self) -> Option<u32> {
        match self {
            RetryPolicy::Unlimited => None,
            RetryPolicy::Limited(max) => Some(*max),
        }
    }
}

impl fmt::Display for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryPolicy::Unlimited => write!(f, "unlimited"),
            RetryPolicy::Limited(max) => write!(f, "{max}"),
        }
    }
}

/// Retry counter for one failure class within one request
#[derive(Debug, Clone)]
pub struct Retrier {
    policy: RetryPolicy,
    backoff: BackoffConfig,
    attempts: u32,
    last_delay: Option<Duration>,
}

impl Retrier {
    /// Create a fresh counter
    pub fn new(policy: RetryPolicy, backoff: BackoffConfig) -> Self {
        Self {
            policy,
            backoff,
            attempts: 0,
            last_delay: None,
        }
    }

    /// Register a failure. Returns the delay to wait before retrying, or
    /// `None` when the retry budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let attempt = self.attempts + 1;
        if !self.policy.allows(attempt) {
            return None;
        }
        let delay = self.backoff.next_delay(attempt, self.last_delay);
        self.attempts = attempt;
        self.last_delay = Some(delay);
        Some(delay)
    }

    /// Retries used so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Policy of this counter
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}
