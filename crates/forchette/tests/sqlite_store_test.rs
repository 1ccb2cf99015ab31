//! Tests for the SQLite session store.

use forchette::{SqliteStore, StateStore, StoreError};
use forchette_core::{
    CategoryScores, Command, Phase, SessionConfig, SessionSnapshot, VoteRequest,
};
use tempfile::NamedTempFile;

/// Creates a temporary database file and an opened store. The file handle
/// must stay in scope to keep the file alive.
fn setup_test_db() -> (NamedTempFile, SqliteStore) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();
    let store = SqliteStore::open(db_path).expect("Failed to open store");
    (db_file, store)
}

fn active_snapshot() -> SessionSnapshot {
    let config = SessionConfig::new(
        vec!["Pizza Place".into(), "Sushi Bar".into()],
        vec!["Alice".into(), "Bob".into()],
    );
    let setup = SessionSnapshot {
        owner_id: Some("alice".to_string()),
        config,
        ..SessionSnapshot::default()
    };
    setup.apply(Command::Start).expect("start").snapshot
}

#[test]
fn test_create_and_load() {
    let (_db, store) = setup_test_db();
    let snapshot = active_snapshot();

    assert_eq!(store.save("ABC123", &snapshot, None), Ok(1));
    let stored = store.load("ABC123").expect("load").expect("present");
    assert_eq!(*stored.revision(), 1);
    assert_eq!(stored.snapshot(), &snapshot);
}

#[test]
fn test_missing_session_is_none() {
    let (_db, store) = setup_test_db();
    assert_eq!(store.load("NOPE").expect("load"), None);
}

#[test]
fn test_duplicate_create_rejected() {
    let (_db, store) = setup_test_db();
    let snapshot = SessionSnapshot::default();
    store.save("ABC123", &snapshot, None).expect("create");
    assert_eq!(
        store.save("ABC123", &snapshot, None),
        Err(StoreError::AlreadyExists("ABC123".to_string()))
    );
}

#[test]
fn test_update_bumps_revision_and_stale_write_conflicts() {
    let (_db, store) = setup_test_db();
    let snapshot = active_snapshot();
    store.save("ABC123", &snapshot, None).expect("create");

    let request = VoteRequest::new(0, 0, CategoryScores::new(9, 9, 9, 9), true);
    let voted = snapshot
        .apply(Command::SubmitVote { request })
        .expect("vote")
        .snapshot;
    assert_eq!(store.save("ABC123", &voted, Some(1)), Ok(2));

    // A writer still holding revision 1 must not clobber the vote.
    assert!(matches!(
        store.save("ABC123", &snapshot, Some(1)),
        Err(StoreError::Conflict { expected: 1, .. })
    ));

    let stored = store.load("ABC123").expect("load").expect("present");
    assert_eq!(*stored.revision(), 2);
    assert_eq!(stored.snapshot().votes.len(), 1);
}

#[test]
fn test_row_columns_track_snapshot() {
    let (_db, store) = setup_test_db();
    let snapshot = active_snapshot();
    store.save("ABC123", &snapshot, None).expect("create");

    let row = store.get_row("ABC123").expect("query").expect("present");
    assert_eq!(row.phase(), &Phase::Active.to_string());
    assert_eq!(row.owner_id().as_deref(), Some("alice"));
    assert_eq!(*row.revision(), 1);

    let owned = store.rows_for_owner("alice").expect("query");
    assert_eq!(owned.len(), 1);
    assert!(store.rows_for_owner("bob").expect("query").is_empty());
}

#[test]
fn test_reopen_keeps_data() {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let store = SqliteStore::open(db_path.clone()).expect("open");
    store
        .save("ABC123", &SessionSnapshot::default(), None)
        .expect("create");
    drop(store);

    let reopened = SqliteStore::open(db_path).expect("reopen");
    assert_eq!(reopened.list().expect("list"), vec!["ABC123"]);
}
