//! Main entry point for the user-data-exporter CLI

use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;
use user_data_exporter::cli::Cli;
use user_data_exporter::metrics::init_metrics;

/// Initialize tracing, switching to JSON lines when `LOG_FORMAT=json`
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("user_data_exporter=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(addr) = cli.metrics_addr {
        init_metrics(addr)
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))
            .context("failed to start metrics endpoint")?;
    }

    if let Err(e) = cli.execute().await {
        if let Some(hint) = e.resume_hint() {
            error!(hint, "Export failed: {}", e);
        }
        return Err(e.into());
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine; the environment may already be set
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }
}
