//! reqwest-backed transport for the users endpoint

use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use super::retry_formatter::RetryErrorType;
use super::transport::{HttpTransport, PageRequest, TransportError, TransportResponse};

/// Default upstream base URL
pub const DEFAULT_API_BASE_URL: &str = "https://auth.privy.io/api/v1";

/// Header carrying the application id on every request
pub const APP_ID_HEADER: &str = "privy-app-id";

/// HTTP connect timeout (seconds)
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default overall request timeout (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Build the shared HTTP client with explicit timeouts so a stalled
/// connection surfaces as a retryable timeout instead of hanging.
pub fn build_http_client(request_timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .timeout(request_timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Application credentials
#[derive(Clone)]
pub struct Credentials {
    app_id: String,
    app_secret: String,
}

impl Credentials {
    /// Build credentials
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
        }
    }

    /// Application id
    pub fn app_id(&self) -> &str {
        &self.app_id
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &"<redacted>")
            .finish()
    }
}

/// Transport issuing real HTTP requests
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    users_url: String,
    credentials: Credentials,
}

impl ReqwestTransport {
    /// Create a transport for `base_url` (trailing slash tolerated)
    pub fn new(client: Client, base_url: impl AsRef<str>, credentials: Credentials) -> Self {
        let users_url = format!("{}/users", base_url.as_ref().trim_end_matches('/'));
        Self {
            client,
            users_url,
            credentials,
        }
    }

    /// Full users endpoint URL
    pub fn users_url(&self) -> &str {
        &self.users_url
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get_users(&self, request: &PageRequest) -> Result<TransportResponse, TransportError> {
        let params = request.query_params();
        debug!(url = %self.users_url, params = params.len(), "GET users page");

        let response = self
            .client
            .get(&self.users_url)
            .query(&params)
            .basic_auth(&self.credentials.app_id, Some(&self.credentials.app_secret))
            .header(APP_ID_HEADER, &self.credentials.app_id)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_error)?;
        Ok(TransportResponse { status, body })
    }
}

fn classify_error(err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        RetryErrorType::NetworkTimeout
    } else if err.is_connect() {
        RetryErrorType::NetworkOffline
    } else {
        RetryErrorType::NetworkGeneric
    };
    TransportError::new(kind, err.to_string())
}
