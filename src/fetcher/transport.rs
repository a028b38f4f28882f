//! Transport seam between the fetch client and the network

use super::retry_formatter::RetryErrorType;
use async_trait::async_trait;
use std::sync::Arc;

/// Query of one users page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Opaque cursor of the page to fetch
    pub cursor: Option<String>,
    /// Only users created strictly after this unix timestamp (seconds)
    pub created_after: Option<i64>,
}

impl PageRequest {
    /// Query parameters in wire order
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(2);
        if let Some(cursor) = &self.cursor {
            params.push(("cursor", cursor.clone()));
        }
        if let Some(created_after) = self.created_after {
            params.push(("created_after", created_after.to_string()));
        }
        params
    }
}

/// Raw response as seen by the retry engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl TransportResponse {
    /// Build a response
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A request that never produced a status
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    /// Classification for retry messages
    pub kind: RetryErrorType,
    /// Underlying error text
    pub message: String,
}

impl TransportError {
    /// Build a transport error
    pub fn new(kind: RetryErrorType, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Sends one `GET /users` request
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue the request and return the raw response
    async fn get_users(&self, request: &PageRequest) -> Result<TransportResponse, TransportError>;

    /// Endpoint label for logs and metrics
    fn endpoint(&self) -> &str {
        "/users"
    }
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn get_users(&self, request: &PageRequest) -> Result<TransportResponse, TransportError> {
        (**self).get_users(request).await
    }

    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }
}
