//! Upstream page fetching
//!
//! [`PagedUserClient`] turns one logical page request into as many HTTP
//! attempts as the retry policies allow, behind the [`UserFetcher`] trait the
//! export driver depends on.

use crate::resume::{Cursor, Watermark};
use crate::Page;
use async_trait::async_trait;

pub mod client;
pub mod http;
pub mod parser;
pub mod retry_formatter;
pub mod transport;

pub use client::PagedUserClient;
pub use transport::{HttpTransport, PageRequest, TransportError, TransportResponse};

/// Fetch errors. Every variant is fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Non-2xx, non-429 response
    #[error("upstream returned HTTP {status}: {body}")]
    Upstream {
        /// HTTP status
        status: u16,
        /// Response body
        body: String,
    },

    /// Body did not have the expected shape
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Retry budget for a failure class was spent
    #[error("request failed after {attempts} retries: {last_error}")]
    ExhaustedRetries {
        /// Retries performed
        attempts: u32,
        /// Error of the final attempt
        last_error: String,
    },
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Source of users pages
#[async_trait]
pub trait UserFetcher: Send + Sync {
    /// Fetch the page at `cursor` (first page when `None`), restricted to
    /// users created after `since` when given.
    async fn fetch_page(&self, cursor: Option<&Cursor>, since: Option<Watermark>) -> FetcherResult<Page>;
}
