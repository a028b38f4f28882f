//! Paginated fetch client with backoff and pacing

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::parser::parse_page;
use super::retry_formatter::{RetryContext, RetryErrorType};
use super::transport::{HttpTransport, PageRequest};
use super::{FetcherError, FetcherResult, UserFetcher};
use crate::downloader::backoff::{BackoffConfig, Retrier, RetryPolicy};
use crate::downloader::config::ExportConfig;
use crate::downloader::pacing::RequestPacer;
use crate::metrics::{record_retry_backoff, HttpRequestMetrics};
use crate::resume::{Cursor, Watermark};
use crate::Page;

/// Fetches one users page at a time.
///
/// 429 responses and transport failures are retried with independent
/// counters. Every successful response is followed by the pacing sleep.
pub struct PagedUserClient<T> {
    transport: T,
    backoff: BackoffConfig,
    rate_limit_retries: RetryPolicy,
    network_retries: RetryPolicy,
    pacer: RequestPacer,
}

impl<T: HttpTransport> PagedUserClient<T> {
    /// Create a client using the retry and pacing settings of `config`
    pub fn new(transport: T, config: &ExportConfig) -> Self {
        Self {
            transport,
            backoff: config.backoff,
            rate_limit_retries: config.rate_limit_retries,
            network_retries: config.network_retries,
            pacer: RequestPacer::new(config.pacing_interval()),
        }
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Sleep after each successful request
    pub fn pacing_interval(&self) -> Duration {
        self.pacer.interval()
    }

    async fn backoff(&self, retrier: &Retrier, ctx: RetryContext) -> RetryContext {
        warn!(
            backoff_ms = ctx.backoff_duration.as_millis() as u64,
            attempt = retrier.attempts(),
            "{}",
            ctx.format_retry()
        );
        record_retry_backoff(ctx.error_type.class_label(), ctx.backoff_duration, retrier.attempts());
        sleep(ctx.backoff_duration).await;
        ctx
    }
}

#[async_trait]
impl<T: HttpTransport> UserFetcher for PagedUserClient<T> {
    async fn fetch_page(&self, cursor: Option<&Cursor>, since: Option<Watermark>) -> FetcherResult<Page> {
        let request = PageRequest {
            cursor: cursor.map(|c| c.as_str().to_string()),
            created_after: since.map(Watermark::unix_seconds),
        };
        let endpoint = self.transport.endpoint().to_string();
        let cursor_label = cursor.map(Cursor::as_str);

        let mut rate_limit = Retrier::new(self.rate_limit_retries, self.backoff);
        let mut network = Retrier::new(self.network_retries, self.backoff);
        let mut last_retry: Option<RetryContext> = None;

        loop {
            let attempt = rate_limit.attempts() + network.attempts() + 1;
            let request_metrics = HttpRequestMetrics::start(endpoint.as_str(), attempt);

            match self.transport.get_users(&request).await {
                Ok(response) if response.is_success() => {
                    request_metrics.record_complete(response.status);
                    let page = parse_page(&response.body)?;

                    if let (Some(requested), Some(next)) = (cursor, page.next_cursor.as_ref()) {
                        if requested == next {
                            return Err(FetcherError::MalformedResponse(format!(
                                "next_cursor did not advance past {requested}"
                            )));
                        }
                    }

                    if let Some(ctx) = last_retry {
                        info!("{}", ctx.format_success());
                    }
                    self.pacer.pace().await;
                    return Ok(page);
                }
                Ok(response) if response.status == 429 => {
                    request_metrics.record_complete(response.status);
                    let Some(delay) = rate_limit.next_delay() else {
                        return Err(FetcherError::ExhaustedRetries {
                            attempts: rate_limit.attempts(),
                            last_error: "HTTP 429 Too Many Requests".to_string(),
                        });
                    };
                    let ctx = RetryContext::new(
                        rate_limit.attempts(),
                        rate_limit.policy().max_retries(),
                        RetryErrorType::RateLimit,
                        delay,
                        "HTTP 429 Too Many Requests",
                        endpoint.as_str(),
                    )
                    .with_cursor(cursor_label);
                    last_retry = Some(self.backoff(&rate_limit, ctx).await);
                }
                Ok(response) => {
                    request_metrics.record_complete(response.status);
                    let kind = RetryErrorType::from_status(response.status);
                    error!(
                        status = response.status,
                        suggestion = kind.suggestion(),
                        "Upstream rejected request: {}",
                        kind.description()
                    );
                    return Err(FetcherError::Upstream {
                        status: response.status,
                        body: response.body,
                    });
                }
                Err(err) => {
                    request_metrics.record_network_error();
                    let Some(delay) = network.next_delay() else {
                        let ctx = RetryContext::new(
                            network.attempts(),
                            network.policy().max_retries(),
                            err.kind,
                            Duration::ZERO,
                            err.message.as_str(),
                            endpoint.as_str(),
                        )
                        .with_cursor(cursor_label);
                        error!("{}", ctx.format_failure());
                        return Err(FetcherError::ExhaustedRetries {
                            attempts: network.attempts(),
                            last_error: err.message,
                        });
                    };
                    let ctx = RetryContext::new(
                        network.attempts(),
                        network.policy().max_retries(),
                        err.kind,
                        delay,
                        err.message.as_str(),
                        endpoint.as_str(),
                    )
                    .with_cursor(cursor_label);
                    last_retry = Some(self.backoff(&network, ctx).await);
                }
            }
        }
    }
}
