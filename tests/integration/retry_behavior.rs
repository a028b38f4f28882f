//! Rate-limit and network retry behavior through the full driver

use crate::support::{connection_refused, page, status, user, ScriptedTransport, Workspace};
use std::time::Duration;
use user_data_exporter::fetcher::FetcherError;
use user_data_exporter::{ExportConfig, ExportError};

#[tokio::test(start_paused = true)]
async fn test_rate_limited_three_times_then_success() {
    let ws = Workspace::new();
    let transport = ScriptedTransport::new(vec![
        status(429, "too many requests"),
        status(429, "too many requests"),
        status(429, "too many requests"),
        page(vec![user("a", 1)], None),
    ]);

    let summary = ws
        .driver(&transport, ExportConfig::default())
        .execute_at(&ws.output(), 1)
        .await
        .unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.new_records, 1);
    assert_eq!(summary.duplicates, 0);

    let requests = transport.requests();
    assert_eq!(requests.len(), 4);
    let sleeps: Vec<Duration> = requests.windows(2).map(|w| w[1].at - w[0].at).collect();

    assert!(sleeps[0] >= Duration::from_millis(1000) && sleeps[0] < Duration::from_millis(1100));
    for pair in sleeps.windows(2) {
        assert!(pair[1] > pair[0], "backoff must grow: {sleeps:?}");
    }
    for sleep in &sleeps {
        assert!(*sleep <= Duration::from_millis(60_000));
    }
    // Second delay is 2x the first within the 10% jitter band
    assert!(sleeps[1] >= Duration::from_millis(1800) && sleeps[1] <= Duration::from_millis(2210));
}

#[tokio::test(start_paused = true)]
async fn test_network_failures_exhaust_and_keep_cursor() {
    let ws = Workspace::new();
    let mut replies = vec![page(vec![user("a", 1)], Some("c1"))];
    replies.extend((0..6).map(|_| connection_refused()));
    let transport = ScriptedTransport::new(replies);

    let err = ws
        .driver(&transport, ExportConfig::default())
        .execute_at(&ws.output(), 1)
        .await
        .unwrap_err();

    match err {
        ExportError::Fetcher(FetcherError::ExhaustedRetries { attempts, .. }) => {
            assert_eq!(attempts, 5)
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // One successful request, then the original attempt plus five retries
    assert_eq!(transport.requests().len(), 7);
    assert_eq!(
        std::fs::read_to_string(ws.cursor_file()).unwrap(),
        "c1",
        "cursor of the last completed page stays in place"
    );
    assert_eq!(ws.output_lines().len(), 2, "page 1 is already durable");
}

#[tokio::test(start_paused = true)]
async fn test_network_counter_is_independent_of_rate_limits() {
    let ws = Workspace::new();
    let mut replies = Vec::new();
    // The full network budget, then a 429 which must still be retried
    replies.extend((0..5).map(|_| connection_refused()));
    replies.push(status(429, "slow down"));
    replies.push(page(vec![user("a", 1)], None));
    let transport = ScriptedTransport::new(replies);

    let summary = ws
        .driver(&transport, ExportConfig::default())
        .execute_at(&ws.output(), 1)
        .await
        .unwrap();

    assert_eq!(summary.new_records, 1);
}

#[tokio::test(start_paused = true)]
async fn test_server_error_is_not_retried() {
    let ws = Workspace::new();
    let transport = ScriptedTransport::new(vec![status(502, "bad gateway")]);

    let err = ws
        .driver(&transport, ExportConfig::default())
        .execute_at(&ws.output(), 1)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExportError::Fetcher(FetcherError::Upstream { status: 502, .. })
    ));
    assert_eq!(transport.requests().len(), 1);
}
