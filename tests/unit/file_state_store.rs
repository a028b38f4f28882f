//! File-backed state store behavior across instances

use tempfile::TempDir;
use user_data_exporter::resume::{
    FileStateStore, ResumeError, RunMode, RunState, StateKey, StateStore,
};

#[test]
fn test_state_survives_a_new_store_instance() {
    let dir = TempDir::new().unwrap();
    let cursor = dir.path().join("state/cursor");
    let watermark = dir.path().join("state/watermark");

    FileStateStore::new(&cursor, &watermark)
        .save(StateKey::Cursor, "c42")
        .unwrap();

    let reopened = FileStateStore::new(&cursor, &watermark);
    let state = RunState::load(&reopened, true).unwrap();
    assert_eq!(state.mode(), RunMode::Resuming);
    assert_eq!(state.cursor().map(|c| c.as_str()), Some("c42"));
}

#[test]
fn test_oversized_state_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let cursor = dir.path().join("cursor");
    std::fs::write(&cursor, vec![b'x'; 2 * 1024 * 1024]).unwrap();

    let store = FileStateStore::new(&cursor, dir.path().join("watermark"));
    assert!(matches!(
        store.load(StateKey::Cursor),
        Err(ResumeError::StateTooLarge { .. })
    ));
}

#[test]
fn test_save_replaces_whole_value() {
    let dir = TempDir::new().unwrap();
    let store = FileStateStore::new(dir.path().join("c"), dir.path().join("w"));

    store.save(StateKey::Cursor, "a-much-longer-cursor").unwrap();
    store.save(StateKey::Cursor, "short").unwrap();
    assert_eq!(
        std::fs::read_to_string(dir.path().join("c")).unwrap(),
        "short"
    );
}
