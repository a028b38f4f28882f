//! End-to-end export passes against a scripted upstream

use crate::support::{page, status, user, ScriptedTransport, Workspace};
use user_data_exporter::fetcher::FetcherError;
use user_data_exporter::output::USERS_CSV_HEADER;
use user_data_exporter::resume::RunMode;
use user_data_exporter::{ExportConfig, ExportError};

#[tokio::test(start_paused = true)]
async fn test_two_page_fresh_run() {
    let ws = Workspace::new();
    let transport = ScriptedTransport::new(vec![
        page(vec![user("a", 100)], Some("c1")),
        page(vec![user("b", 101)], None),
    ]);

    let summary = ws
        .driver(&transport, ExportConfig::default())
        .execute_at(&ws.output(), 1_700_000_000)
        .await
        .unwrap();

    assert_eq!(summary.mode, RunMode::ColdStart);
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.new_records, 2);
    assert_eq!(summary.duplicates, 0);

    let lines = ws.output_lines();
    assert_eq!(lines.len(), 3);
    let header: Vec<String> = USERS_CSV_HEADER.iter().map(|c| format!("\"{c}\"")).collect();
    assert_eq!(lines[0], header.join(","));
    assert_eq!(
        lines[1],
        r#""a","100","true","a@example.com","0xa","2""#
    );
    assert!(lines[2].starts_with(r#""b","101""#));

    assert!(!ws.cursor_file().exists(), "cursor retired after the pass");
    assert!(!ws.watermark_file().exists(), "no watermark outside incremental mode");

    let requests = transport.requests();
    assert_eq!(requests[0].request.cursor, None);
    assert_eq!(requests[1].request.cursor.as_deref(), Some("c1"));
}

#[tokio::test(start_paused = true)]
async fn test_empty_terminal_page_ends_the_pass() {
    let ws = Workspace::new();
    let transport = ScriptedTransport::new(vec![page(vec![], None)]);

    let summary = ws
        .driver(&transport, ExportConfig::default())
        .execute_at(&ws.output(), 1)
        .await
        .unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.new_records, 0);
    assert_eq!(ws.output_lines().len(), 1, "header only");
    assert_eq!(transport.remaining(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_existing_rows_are_not_exported_twice() {
    let ws = Workspace::new();
    let first = ScriptedTransport::new(vec![page(vec![user("a", 1), user("b", 2)], None)]);
    ws.driver(&first, ExportConfig::default())
        .execute_at(&ws.output(), 10)
        .await
        .unwrap();

    let second = ScriptedTransport::new(vec![page(vec![user("b", 2), user("c", 3)], None)]);
    let summary = ws
        .driver(&second, ExportConfig::default())
        .execute_at(&ws.output(), 20)
        .await
        .unwrap();

    assert_eq!(summary.previously_exported, 2);
    assert_eq!(summary.new_records, 1);
    assert_eq!(summary.duplicates, 1);

    let lines = ws.output_lines();
    assert_eq!(lines.len(), 4, "one header, three distinct users");
    assert_eq!(lines.iter().filter(|l| l.starts_with("\"b\"")).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_client_error_is_fatal_and_not_retried() {
    let ws = Workspace::new();
    let transport = ScriptedTransport::new(vec![status(403, "forbidden")]);

    let err = ws
        .driver(&transport, ExportConfig::default())
        .execute_at(&ws.output(), 1)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExportError::Fetcher(FetcherError::Upstream { status: 403, .. })
    ));
    assert_eq!(transport.requests().len(), 1);
    assert!(err.resume_hint().contains("Re-run"));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_body_is_fatal() {
    let ws = Workspace::new();
    let transport = ScriptedTransport::new(vec![status(200, r#"{"data": []}"#)]);

    let err = ws
        .driver(&transport, ExportConfig::default())
        .execute_at(&ws.output(), 1)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExportError::Fetcher(FetcherError::MalformedResponse(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_batch_cooldown_between_pages() {
    let ws = Workspace::new();
    let transport = ScriptedTransport::new(vec![
        page(vec![user("a", 1), user("b", 2)], Some("c1")),
        page(vec![user("c", 3)], Some("c2")),
        page(vec![user("d", 4)], None),
    ]);
    let config = ExportConfig {
        batch_size: 2,
        ..ExportConfig::default()
    };

    ws.driver(&transport, config.clone())
        .execute_at(&ws.output(), 1)
        .await
        .unwrap();

    let requests = transport.requests();
    let pacing = config.pacing_interval();
    // Page 1 filled a batch: pacing plus cooldown before page 2
    assert!(requests[1].at - requests[0].at >= pacing + config.batch_cooldown);
    // Only one new record since the cooldown: pacing only before page 3
    assert!(requests[2].at - requests[1].at < pacing + config.batch_cooldown);
}
