//! Observability metrics for the exporter
//!
//! Metrics go through the `metrics` facade. Without a recorder installed every
//! call is a no-op, so the export path records unconditionally and the binary
//! decides whether to expose a Prometheus scrape endpoint.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Install the Prometheus exporter and describe every metric.
///
/// Idempotent: a second call is a no-op.
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Requests sent to the users endpoint, by status"
    );
    describe_counter!(
        "http_429_errors_total",
        Unit::Count,
        "Rate limit responses received"
    );
    describe_counter!(
        "http_retries_total",
        Unit::Count,
        "Retries scheduled, by failure class"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "Users endpoint request duration"
    );
    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Backoff slept before a retry"
    );
    describe_counter!("export_pages_total", Unit::Count, "Pages processed");
    describe_counter!(
        "export_records_total",
        Unit::Count,
        "Records processed, by outcome (new or duplicate)"
    );
    describe_counter!(
        "exports_completed_total",
        Unit::Count,
        "Export passes completed"
    );
    describe_counter!("exports_failed_total", Unit::Count, "Export runs aborted");

    *initialized = true;
    info!(%addr, "Prometheus metrics endpoint listening");
    Ok(())
}

/// Next request correlation id (`req-0000002a`)
pub fn next_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Timing and outcome of one upstream request
pub struct HttpRequestMetrics {
    endpoint: String,
    start_time: Instant,
    correlation_id: String,
    attempt: u32,
}

impl HttpRequestMetrics {
    /// Start timing a request. `attempt` is 1 for the first try.
    pub fn start(endpoint: impl Into<String>, attempt: u32) -> Self {
        let endpoint = endpoint.into();
        let correlation_id = next_correlation_id();
        debug!(%correlation_id, %endpoint, attempt, "Sending request");
        Self {
            endpoint,
            start_time: Instant::now(),
            correlation_id,
            attempt,
        }
    }

    /// Record a response with `status_code`
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => status_code.to_string(),
        )
        .increment(1);
        histogram!("http_request_duration_seconds", "endpoint" => self.endpoint.clone())
            .record(duration.as_secs_f64());

        if status_code == 429 {
            counter!("http_429_errors_total", "endpoint" => self.endpoint.clone()).increment(1);
            warn!(
                correlation_id = %self.correlation_id,
                attempt = self.attempt,
                duration_ms = duration.as_millis() as u64,
                "Rate limited (429)"
            );
        } else {
            debug!(
                correlation_id = %self.correlation_id,
                status = status_code,
                duration_ms = duration.as_millis() as u64,
                "Request completed"
            );
        }
    }

    /// Record a request that never produced a status
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => "network_error",
        )
        .increment(1);
        histogram!("http_request_duration_seconds", "endpoint" => self.endpoint.clone())
            .record(duration.as_secs_f64());

        warn!(
            correlation_id = %self.correlation_id,
            attempt = self.attempt,
            duration_ms = duration.as_millis() as u64,
            "Network error"
        );
    }
}

/// Record a scheduled retry for `class` (`rate_limit` or `network`)
pub fn record_retry_backoff(class: &'static str, duration: Duration, attempt: u32) {
    counter!("http_retries_total", "class" => class).increment(1);
    histogram!("retry_backoff_duration_seconds", "class" => class).record(duration.as_secs_f64());
    debug!(class, attempt, backoff_ms = duration.as_millis() as u64, "Retry backoff recorded");
}

/// Record one processed page
pub fn record_page(new_records: u64, duplicates: u64) {
    counter!("export_pages_total").increment(1);
    counter!("export_records_total", "outcome" => "new").increment(new_records);
    counter!("export_records_total", "outcome" => "duplicate").increment(duplicates);
}

/// Run-level outcome tracking
pub struct ExportMetrics {
    mode: String,
    start_time: Instant,
}

impl ExportMetrics {
    /// Start tracking a run in `mode`
    pub fn start(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            start_time: Instant::now(),
        }
    }

    /// Record a completed pass
    pub fn record_success(&self, new_records: u64) {
        counter!("exports_completed_total", "mode" => self.mode.clone()).increment(1);
        info!(
            mode = %self.mode,
            new_records,
            duration_secs = self.start_time.elapsed().as_secs(),
            "Export pass completed"
        );
    }

    /// Record an aborted run
    pub fn record_failure(&self, error: &str) {
        counter!("exports_failed_total", "mode" => self.mode.clone()).increment(1);
        error!(
            mode = %self.mode,
            error = %error,
            duration_secs = self.start_time.elapsed().as_secs(),
            "Export failed"
        );
    }
}
