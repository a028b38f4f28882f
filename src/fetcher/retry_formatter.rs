//! Retry classification and operator-facing retry messages.
//!
//! Every retry and every final failure goes through [`RetryContext`] so log
//! lines have one consistent shape regardless of which failure class fired.

use std::time::Duration;

/// Classification of a failed request attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Request or connect timeout
    NetworkTimeout,
    /// Connection refused, DNS failure and similar offline conditions
    NetworkOffline,
    /// HTTP 429
    RateLimit,
    /// Authentication failures (401/403)
    AuthFailed(u16),
    /// Any other non-2xx status
    Upstream(u16),
    /// Transport failure with no better classification
    NetworkGeneric,
}

impl RetryErrorType {
    /// Classify a non-2xx HTTP status
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimit,
            401 | 403 => Self::AuthFailed(status),
            _ => Self::Upstream(status),
        }
    }

    /// Short description used inside retry lines
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::RateLimit => "rate limit exceeded",
            Self::AuthFailed(_) => "authentication failed",
            Self::Upstream(code) if *code >= 500 => "server error",
            Self::Upstream(_) => "client error",
            Self::NetworkGeneric => "network error",
        }
    }

    /// Remediation shown with a final failure
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Check your network connection or raise HTTP_TIMEOUT_SECS",
            Self::NetworkOffline => "Verify internet connectivity and DNS resolution",
            Self::RateLimit => "Lower MAX_REQUESTS_PER_MINUTE or raise RATE_LIMIT_MS",
            Self::AuthFailed(_) => "Verify APP_ID and APP_SECRET",
            Self::Upstream(code) if *code >= 500 => "The upstream service may be degraded, try again later",
            Self::Upstream(_) => "Check API_BASE_URL and the request parameters",
            Self::NetworkGeneric => "Check network connectivity and try again",
        }
    }

    /// Whether the engine retries this class
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::NetworkTimeout | Self::NetworkOffline | Self::NetworkGeneric
        )
    }

    /// Metric label for the retry counter
    pub fn class_label(&self) -> &'static str {
        match self {
            Self::RateLimit => "rate_limit",
            _ => "network",
        }
    }
}

/// Context of one retry decision
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Retry number for this failure class (1-based)
    pub attempt: u32,
    /// Cap for this class, `None` when unlimited
    pub max_attempts: Option<u32>,
    /// What went wrong
    pub error_type: RetryErrorType,
    /// Sleep before the next attempt
    pub backoff_duration: Duration,
    /// Cursor of the page being fetched
    pub cursor: Option<String>,
    /// Underlying error text
    pub error_message: String,
    /// Endpoint that failed
    pub endpoint: String,
}

impl RetryContext {
    /// Build a context for `endpoint`
    pub fn new(
        attempt: u32,
        max_attempts: Option<u32>,
        error_type: RetryErrorType,
        backoff_duration: Duration,
        error_message: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type,
            backoff_duration,
            cursor: None,
            error_message: error_message.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Attach the page cursor
    pub fn with_cursor(mut self, cursor: Option<&str>) -> Self {
        self.cursor = cursor.map(str::to_string);
        self
    }

    fn attempt_label(&self) -> String {
        match self.max_attempts {
            Some(max) => format!("{}/{}", self.attempt, max),
            None => self.attempt.to_string(),
        }
    }

    /// `Retrying (attempt 2/5) after connection failed - waiting 2.1 seconds...`
    pub fn format_retry(&self) -> String {
        let mut message = format!(
            "Retrying (attempt {}) after {} - waiting {:.1} seconds...",
            self.attempt_label(),
            self.error_type.description(),
            self.backoff_duration.as_secs_f64()
        );
        append_cursor(&mut message, self.cursor.as_deref());
        message
    }

    /// Logged when a request succeeds after at least one retry
    pub fn format_success(&self) -> String {
        let mut message = format!(
            "Retry attempt {} succeeded - resuming export",
            self.attempt_label()
        );
        append_cursor(&mut message, self.cursor.as_deref());
        message
    }

    /// Multi-line summary logged when the retry budget is spent
    pub fn format_failure(&self) -> String {
        let mut lines = vec![
            format!("[FAILED] Request failed after {} attempts", self.attempt_label()),
            format!("  Last error: {}", self.error_message),
            format!("  Cursor: {}", self.cursor.as_deref().unwrap_or("(first page)")),
            format!("  Endpoint: {}", self.endpoint),
            "  Suggestions:".to_string(),
        ];
        for suggestion in self.format_suggestions() {
            lines.push(format!("    - {suggestion}"));
        }
        lines.join("\n")
    }

    /// Suggestions tailored to this failure
    pub fn format_suggestions(&self) -> Vec<String> {
        vec![
            self.error_type.suggestion().to_string(),
            "Re-run the exporter to resume from the last saved cursor".to_string(),
        ]
    }
}

fn append_cursor(buffer: &mut String, cursor: Option<&str>) {
    if let Some(cursor) = cursor {
        buffer.push_str(&format!(" (cursor {cursor})"));
    }
}
