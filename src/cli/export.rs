//! Export command: configuration surface and summary output

use crate::downloader::config::{
    DEFAULT_BATCH_COOLDOWN_MS, DEFAULT_BATCH_SIZE, DEFAULT_MAX_REQUESTS_PER_MINUTE,
    DEFAULT_RATE_LIMIT_MS,
};
use crate::downloader::{ExportConfig, ExportDriver, ExportError, ExportSummary};
use crate::fetcher::http::{
    build_http_client, Credentials, ReqwestTransport, DEFAULT_API_BASE_URL,
    DEFAULT_HTTP_TIMEOUT_SECS,
};
use crate::fetcher::PagedUserClient;
use crate::output::unique_output_path;
use crate::resume::FileStateStore;
use chrono::Utc;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use super::CliError;

/// Export every user of the upstream API into an append-only CSV file.
///
/// Progress is checkpointed after every page; re-running after a failure
/// resumes from the last saved cursor.
#[derive(Parser, Debug)]
#[command(name = "user-data-exporter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Application id (also sent as the app-id header)
    #[arg(long, env = "APP_ID")]
    pub app_id: String,

    /// Application secret
    #[arg(long, env = "APP_SECRET", hide_env_values = true)]
    pub app_secret: String,

    /// Upstream API base URL
    #[arg(long, env = "API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: String,

    /// Output CSV file
    #[arg(long, env = "OUTPUT_FILE", default_value = "users.csv")]
    pub output: PathBuf,

    /// File holding the cursor of an interrupted pass
    #[arg(long, env = "CURSOR_FILE", default_value = ".export_cursor")]
    pub cursor_file: PathBuf,

    /// File holding the start time of the last completed pass
    #[arg(long, env = "WATERMARK_FILE", default_value = ".export_watermark")]
    pub watermark_file: PathBuf,

    /// Only fetch users created after the last completed pass started
    #[arg(long, env = "INCREMENTAL", default_value_t = false)]
    pub incremental: bool,

    /// Write to a new file named with a millisecond timestamp
    #[arg(long, env = "UNIQUE_OUTPUT_FILENAME", default_value_t = false)]
    pub unique_output: bool,

    /// New users exported between two batch cooldowns
    #[arg(long, env = "USERS_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: u64,

    /// Sleep after each full batch, in milliseconds
    #[arg(long, env = "BATCH_COOLDOWN_MS", default_value_t = DEFAULT_BATCH_COOLDOWN_MS)]
    pub batch_cooldown_ms: u64,

    /// Minimum delay after every successful request, in milliseconds
    #[arg(long, env = "RATE_LIMIT_MS", default_value_t = DEFAULT_RATE_LIMIT_MS)]
    pub rate_limit_ms: u64,

    /// Maximum successful requests per minute
    #[arg(long, env = "MAX_REQUESTS_PER_MINUTE", default_value_t = DEFAULT_MAX_REQUESTS_PER_MINUTE,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub max_requests_per_minute: u32,

    /// Overall HTTP request timeout, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub http_timeout_secs: u64,

    /// Summary format (json or human)
    #[arg(long, default_value = "human")]
    pub output_format: OutputFormat,

    /// Serve Prometheus metrics on this address (e.g. 0.0.0.0:9090)
    #[arg(long, env = "METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Driver configuration derived from the flags
    pub fn export_config(&self) -> ExportConfig {
        ExportConfig {
            batch_size: self.batch_size,
            batch_cooldown: Duration::from_millis(self.batch_cooldown_ms),
            rate_limit: Duration::from_millis(self.rate_limit_ms),
            max_requests_per_minute: self.max_requests_per_minute,
            incremental: self.incremental,
            ..ExportConfig::default()
        }
    }

    /// Output file for a run started at `now_ms`
    pub fn output_path(&self, now_ms: i64) -> PathBuf {
        if self.unique_output {
            unique_output_path(&self.output, now_ms)
        } else {
            self.output.clone()
        }
    }

    fn credentials(&self) -> Result<Credentials, CliError> {
        if self.app_id.trim().is_empty() || self.app_secret.trim().is_empty() {
            return Err(CliError::InvalidArgument(
                "APP_ID and APP_SECRET must not be empty".to_string(),
            ));
        }
        Ok(Credentials::new(self.app_id.trim(), self.app_secret.trim()))
    }

    /// Run the export and print the summary
    pub async fn execute(&self) -> Result<ExportSummary, CliError> {
        let credentials = self.credentials()?;
        let config = self.export_config();
        config.validate().map_err(CliError::InvalidArgument)?;

        let started = Utc::now();
        let output_path = self.output_path(started.timestamp_millis());

        let client = build_http_client(Duration::from_secs(self.http_timeout_secs))
            .map_err(|e| CliError::ConfigurationError(format!("failed to build HTTP client: {e}")))?;
        let transport = ReqwestTransport::new(client, &self.api_base_url, credentials);
        let fetcher = PagedUserClient::new(transport, &config);
        let store = FileStateStore::new(&self.cursor_file, &self.watermark_file);

        info!(
            output = %output_path.display(),
            incremental = config.incremental,
            pacing_ms = fetcher.pacing_interval().as_millis() as u64,
            "Starting user export"
        );

        let driver = ExportDriver::new(fetcher, store, config);
        let result = driver.execute_at(&output_path, started.timestamp()).await;

        match self.output_format {
            OutputFormat::Json => output_json(&result),
            OutputFormat::Human => output_human(&result),
        }

        result.map_err(CliError::from)
    }
}

/// Summary format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON object on stdout
    Json,
    /// Human-readable lines
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

fn output_json(result: &Result<ExportSummary, ExportError>) {
    let output = match result {
        Ok(summary) => serde_json::json!({
            "success": true,
            "summary": summary,
        }),
        Err(e) => serde_json::json!({
            "success": false,
            "error": e.to_string(),
            "hint": e.resume_hint(),
        }),
    };
    println!("{output}");
}

fn output_human(result: &Result<ExportSummary, ExportError>) {
    match result {
        Ok(summary) => {
            println!("\nExport completed successfully!");
            println!("Mode: {}", summary.mode);
            println!("Output: {}", summary.output_path.display());
            println!("Pages fetched: {}", summary.pages);
            println!("Users processed: {}", summary.processed);
            println!("New users written: {}", summary.new_records);
            if summary.duplicates > 0 {
                println!("Duplicates skipped: {}", summary.duplicates);
            }
            if let Some(watermark) = summary.watermark_written {
                println!("Watermark: {watermark}");
            }
        }
        Err(e) => {
            eprintln!("\nExport failed!");
            eprintln!("Error: {e}");
            eprintln!("{}", e.resume_hint());
        }
    }
}
