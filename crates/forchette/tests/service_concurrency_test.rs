//! Concurrent writers against one session.

use std::sync::{Arc, Barrier};
use std::thread;

use forchette::{MemoryStore, ServiceError, SessionService, SqliteStore, StateStore};
use forchette_core::{CategoryScores, SessionConfig, SessionError, VoteRequest};
use tempfile::NamedTempFile;

const WRITERS: usize = 8;

fn started(store: Arc<dyn StateStore>) -> SessionService {
    let service = SessionService::new(store).with_conflict_retries(WRITERS as u32);
    let config = SessionConfig::new(
        vec!["Pizza Place".into(), "Sushi Bar".into()],
        vec!["Alice".into(), "Bob".into()],
    );
    service.create_session("RACE", None, config).expect("create");
    service.start_session("RACE").expect("start");
    service
}

/// Every writer votes for slot (0,0) at once; exactly one may win.
fn race_for_first_slot(service: SessionService) {
    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let service = service.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let score = i as i32;
                let scores = CategoryScores::new(score, score, score, score);
                let request = VoteRequest::new(0, 0, scores, false);
                service.submit_vote("RACE", request)
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("writer panicked"))
        .collect();

    let accepted: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(accepted.len(), 1, "exactly one vote may fill the slot");

    for result in results.iter().filter(|r| r.is_err()) {
        assert!(
            matches!(
                result,
                Err(ServiceError::Session(SessionError::SlotMismatch { .. }))
            ),
            "losers see a stale-slot error, got {:?}",
            result
        );
    }

    let (_, winner) = accepted[0];
    let snapshot = service.get("RACE").expect("get");
    assert_eq!(snapshot.votes.len(), 1);
    assert_eq!(
        snapshot.votes.values().next().map(|v| v.total()),
        Some(winner.total())
    );
    assert_eq!(snapshot.cursor.participant(), 1);
}

#[test]
fn test_memory_store_race() {
    race_for_first_slot(started(Arc::new(MemoryStore::new())));
}

#[test]
fn test_sqlite_store_race() {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();
    let store = SqliteStore::open(db_path).expect("open");
    race_for_first_slot(started(Arc::new(store)));
}

#[test]
fn test_sequential_writers_fill_every_slot() {
    let service = started(Arc::new(MemoryStore::new()));
    for (round, participant) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
        let request = VoteRequest::new(round, participant, CategoryScores::default(), false);
        service.submit_vote("RACE", request).expect("vote");
    }
    let ranking = service.get_ranking("RACE").expect("ranking");
    assert_eq!(ranking.len(), 2);
    assert_eq!(*ranking[0].score(), 40);
}
