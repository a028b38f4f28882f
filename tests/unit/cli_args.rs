//! Unit tests for the CLI surface

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use user_data_exporter::cli::{Cli, OutputFormat};

fn base_args() -> Vec<&'static str> {
    vec!["user-data-exporter", "--app-id", "app", "--app-secret", "secret"]
}

#[test]
fn test_defaults() {
    let cli = Cli::try_parse_from(base_args()).unwrap();

    assert_eq!(cli.output, PathBuf::from("users.csv"));
    assert_eq!(cli.cursor_file, PathBuf::from(".export_cursor"));
    assert_eq!(cli.watermark_file, PathBuf::from(".export_watermark"));
    assert_eq!(cli.api_base_url, "https://auth.privy.io/api/v1");
    assert!(!cli.incremental);
    assert!(!cli.unique_output);
    assert_eq!(cli.output_format, OutputFormat::Human);

    let config = cli.export_config();
    assert_eq!(config.batch_size, 2500);
    assert_eq!(config.batch_cooldown, Duration::from_secs(10));
    assert_eq!(config.pacing_interval(), Duration::from_millis(1000));
}

#[test]
fn test_overrides_flow_into_config() {
    let mut args = base_args();
    args.extend([
        "--incremental",
        "--batch-size",
        "100",
        "--batch-cooldown-ms",
        "250",
        "--rate-limit-ms",
        "2000",
        "--max-requests-per-minute",
        "120",
        "--output-format",
        "json",
    ]);
    let cli = Cli::try_parse_from(args).unwrap();
    let config = cli.export_config();

    assert!(config.incremental);
    assert_eq!(config.batch_size, 100);
    assert_eq!(config.batch_cooldown, Duration::from_millis(250));
    assert_eq!(config.pacing_interval(), Duration::from_millis(2000));
    assert_eq!(cli.output_format, OutputFormat::Json);
}

#[test]
fn test_unique_output_path() {
    let mut args = base_args();
    args.extend(["--unique-output", "--output", "exports/users.csv"]);
    let cli = Cli::try_parse_from(args).unwrap();

    assert_eq!(
        cli.output_path(1_700_000_000_000),
        PathBuf::from("exports/users_1700000000000.csv")
    );
}

#[test]
fn test_zero_batch_size_is_rejected() {
    let mut args = base_args();
    args.extend(["--batch-size", "0"]);
    assert!(Cli::try_parse_from(args).is_err());
}

#[test]
fn test_unknown_output_format_is_rejected() {
    let mut args = base_args();
    args.extend(["--output-format", "xml"]);
    assert!(Cli::try_parse_from(args).is_err());
}
