//! Resuming interrupted passes and incremental re-runs

use crate::support::{page, status, user, ScriptedTransport, Workspace};
use user_data_exporter::resume::{RunMode, StateKey, StateStore};
use user_data_exporter::ExportConfig;

fn incremental() -> ExportConfig {
    ExportConfig::default().with_incremental(true)
}

#[tokio::test(start_paused = true)]
async fn test_interrupted_pass_resumes_without_duplicates() {
    let ws = Workspace::new();

    let first = ScriptedTransport::new(vec![
        page(vec![user("a", 1), user("b", 2)], Some("c1")),
        status(500, "internal error"),
    ]);
    ws.driver(&first, ExportConfig::default())
        .execute_at(&ws.output(), 10)
        .await
        .unwrap_err();
    assert_eq!(std::fs::read_to_string(ws.cursor_file()).unwrap(), "c1");

    // Upstream re-serves `b` on the resumed page
    let second = ScriptedTransport::new(vec![page(vec![user("b", 2), user("c", 3)], None)]);
    let summary = ws
        .driver(&second, ExportConfig::default())
        .execute_at(&ws.output(), 20)
        .await
        .unwrap();

    assert_eq!(summary.mode, RunMode::Resuming);
    assert_eq!(summary.new_records, 1);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(second.requests()[0].request.cursor.as_deref(), Some("c1"));

    let ids: Vec<String> = ws
        .output_lines()
        .iter()
        .skip(1)
        .map(|line| line.split(',').next().unwrap().trim_matches('"').to_string())
        .collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert!(!ws.cursor_file().exists());
}

#[tokio::test(start_paused = true)]
async fn test_incremental_rerun_filters_by_watermark() {
    let ws = Workspace::new();

    let first = ScriptedTransport::new(vec![page(vec![user("a", 100)], None)]);
    let summary = ws
        .driver(&first, incremental())
        .execute_at(&ws.output(), 1_700_000_000)
        .await
        .unwrap();
    assert_eq!(summary.mode, RunMode::ColdStart);
    assert_eq!(summary.watermark_written, Some(1_700_000_000));
    assert_eq!(first.requests()[0].request.created_after, None);
    assert_eq!(
        std::fs::read_to_string(ws.watermark_file()).unwrap(),
        "1700000000"
    );

    let second = ScriptedTransport::new(vec![page(vec![user("a", 100)], None)]);
    let summary = ws
        .driver(&second, incremental())
        .execute_at(&ws.output(), 1_700_000_500)
        .await
        .unwrap();

    assert_eq!(summary.mode, RunMode::Incremental);
    assert_eq!(second.requests()[0].request.created_after, Some(1_700_000_000));
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.new_records, 0);
    assert_eq!(
        ws.store().load(StateKey::Watermark).unwrap().as_deref(),
        Some("1700000500")
    );
}

#[tokio::test(start_paused = true)]
async fn test_since_filter_applies_to_every_page_of_incremental_pass() {
    let ws = Workspace::new();
    ws.store().save(StateKey::Watermark, "500").unwrap();

    let transport = ScriptedTransport::new(vec![
        page(vec![user("a", 600)], Some("c1")),
        page(vec![user("b", 700)], None),
    ]);
    ws.driver(&transport, incremental())
        .execute_at(&ws.output(), 900)
        .await
        .unwrap();

    for recorded in transport.requests() {
        assert_eq!(recorded.request.created_after, Some(500));
    }
}

#[tokio::test(start_paused = true)]
async fn test_cursor_file_takes_precedence_over_watermark() {
    let ws = Workspace::new();
    ws.store().save(StateKey::Cursor, "c5").unwrap();
    ws.store().save(StateKey::Watermark, "500").unwrap();

    let transport = ScriptedTransport::new(vec![page(vec![user("z", 1)], None)]);
    let summary = ws
        .driver(&transport, incremental())
        .execute_at(&ws.output(), 900)
        .await
        .unwrap();

    assert_eq!(summary.mode, RunMode::Resuming);
    let request = &transport.requests()[0].request;
    assert_eq!(request.cursor.as_deref(), Some("c5"));
    assert_eq!(request.created_after, None);
    assert_eq!(summary.watermark_written, Some(900));
}

#[tokio::test(start_paused = true)]
async fn test_failed_incremental_pass_keeps_old_watermark() {
    let ws = Workspace::new();
    ws.store().save(StateKey::Watermark, "500").unwrap();

    let transport = ScriptedTransport::new(vec![status(401, "unauthorized")]);
    ws.driver(&transport, incremental())
        .execute_at(&ws.output(), 900)
        .await
        .unwrap_err();

    assert_eq!(
        ws.store().load(StateKey::Watermark).unwrap().as_deref(),
        Some("500")
    );
    assert!(!ws.cursor_file().exists());
}

#[tokio::test(start_paused = true)]
async fn test_corrupt_watermark_aborts_before_fetching() {
    let ws = Workspace::new();
    std::fs::write(ws.watermark_file(), "yesterday").unwrap();

    let transport = ScriptedTransport::new(vec![]);
    let err = ws
        .driver(&transport, incremental())
        .execute_at(&ws.output(), 900)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("invalid state"));
    assert!(transport.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_partial_row_from_crash_is_rewritten_on_resume() {
    let ws = Workspace::new();
    std::fs::write(
        ws.output(),
        "\"id\",\"created_at\",\"has_accepted_terms\",\"email\",\"wallet_address\",\"linked_accounts_count\"\n\
         \"a\",\"1\",\"true\",\"a@example.com\",\"0xa\",\"2\"\n\
         \"b\",\"2\",\"tr",
    )
    .unwrap();
    ws.store().save(StateKey::Cursor, "c1").unwrap();

    let transport = ScriptedTransport::new(vec![page(vec![user("b", 2), user("c", 3)], None)]);
    let summary = ws
        .driver(&transport, ExportConfig::default())
        .execute_at(&ws.output(), 30)
        .await
        .unwrap();

    assert_eq!(summary.mode, RunMode::Resuming);
    assert_eq!(summary.new_records, 2);
    assert_eq!(summary.duplicates, 0);

    let lines = ws.output_lines();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[2], r#""b","2","true","b@example.com","0xb","2""#);
}
