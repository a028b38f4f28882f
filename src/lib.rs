//! # User Data Exporter Library
//!
//! Exports the complete user set of a cursor-paginated upstream API into a local,
//! append-only CSV file. Built to be run repeatedly by a single operator, by hand
//! or from a scheduler, and to survive rate limits, flaky networks and restarts.
//!
//! ## Features
//!
//! - **Cursor Pagination**: Pages are fetched strictly one at a time
//! - **Backoff With Jitter**: 429 responses are retried indefinitely, network failures up to 5 times
//! - **Resume Capability**: The cursor is checkpointed after every page
//! - **Incremental Runs**: A watermark limits later passes to newly created users
//! - **Deduplication**: Identifiers already in the output file are never written twice
//!
//! ## Quick Start
//!
//! ```no_run
//! use user_data_exporter::downloader::{ExportConfig, ExportDriver};
//! use user_data_exporter::fetcher::http::{build_http_client, Credentials, ReqwestTransport};
//! use user_data_exporter::fetcher::PagedUserClient;
//! use user_data_exporter::resume::FileStateStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExportConfig::default();
//! let transport = ReqwestTransport::new(
//!     build_http_client(std::time::Duration::from_secs(30))?,
//!     "https://auth.privy.io/api/v1",
//!     Credentials::new("app-id", "app-secret"),
//! );
//! let client = PagedUserClient::new(transport, &config);
//! let store = FileStateStore::new(".export_cursor", ".export_watermark");
//!
//! let driver = ExportDriver::new(client, store, config);
//! let summary = driver.execute("users.csv".as_ref()).await?;
//! println!("{} new users", summary.new_records);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`downloader`] - Export driver, backoff controller, pacing and configuration
//! - [`fetcher`] - Paginated fetch client and its HTTP transport
//! - [`dedup`] - In-memory index of identifiers already exported
//! - [`output`] - CSV sink and output path helpers
//! - [`resume`] - Cursor and watermark persistence

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// CLI surface
pub mod cli;

/// Deduplication index
pub mod dedup;

/// Export orchestration
pub mod downloader;

/// Upstream page fetching
pub mod fetcher;

/// Metrics facade helpers
pub mod metrics;

/// Output sink
pub mod output;

/// Cursor and watermark persistence
pub mod resume;

pub use downloader::{ExportConfig, ExportDriver, ExportError, ExportSummary};
pub use resume::{Cursor, Watermark};

/// A single upstream user.
///
/// Only `id` and `created_at` are interpreted by the export engine; everything
/// else is carried as opaque attributes for the output formatter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    /// Stable unique identifier
    pub id: String,
    /// Creation time (Unix timestamp in seconds)
    pub created_at: i64,
    /// Remaining upstream fields
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl UserRecord {
    /// Create a record with no extra attributes
    pub fn new(id: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            created_at,
            attributes: Map::new(),
        }
    }

    /// Attach an opaque attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Whether the user accepted the terms of service. Missing means `false`.
    pub fn has_accepted_terms(&self) -> bool {
        self.attributes
            .get("has_accepted_terms")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Linked accounts (sub-fields), empty when absent or not an array
    pub fn linked_accounts(&self) -> &[Value] {
        self.attributes
            .get("linked_accounts")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Look up `field` on the first linked account whose `type` equals `account_type`
    pub fn linked_account_field(&self, account_type: &str, field: &str) -> Option<&str> {
        self.linked_accounts()
            .iter()
            .find(|account| account.get("type").and_then(Value::as_str) == Some(account_type))
            .and_then(|account| account.get(field))
            .and_then(Value::as_str)
    }
}

/// One page of upstream results
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Records in upstream order
    pub records: Vec<UserRecord>,
    /// Cursor for the next page, `None` on the final page
    pub next_cursor: Option<Cursor>,
}

impl Page {
    /// Whether this is the last page of the pass
    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}
