//! Storage boundary for session snapshots.
//!
//! Stores keep one [`SessionSnapshot`] per session id together with a
//! revision counter. The counter is the only concurrency primitive: a save
//! names the revision it read, and the store refuses it if another writer
//! got there first.

use derive_getters::Getters;
use derive_more::Display;
use forchette_core::SessionSnapshot;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Monotonic per-session write counter.
pub type Revision = u64;

/// A snapshot as persisted, with the revision it was written at.
#[derive(Debug, Clone, PartialEq, Eq, Getters, derive_new::new)]
pub struct StoredSession {
    /// The persisted session.
    snapshot: SessionSnapshot,
    /// Revision of this write.
    revision: Revision,
}

impl StoredSession {
    /// Splits into snapshot and revision.
    pub fn into_parts(self) -> (SessionSnapshot, Revision) {
        (self.snapshot, self.revision)
    }
}

/// Storage failure.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum StoreError {
    /// Another writer saved since the expected revision.
    #[display("Session '{}' changed since revision {}", session_id, expected)]
    Conflict {
        /// The contended session.
        session_id: String,
        /// Revision the writer read.
        expected: Revision,
    },

    /// Create attempted for an id already in use.
    #[display("Session '{}' already exists", _0)]
    AlreadyExists(String),

    /// A stored snapshot could not be decoded.
    #[display("Stored snapshot for '{}' is unreadable: {}", session_id, message)]
    Malformed {
        /// The session whose record is unreadable.
        session_id: String,
        /// Decoder message.
        message: String,
    },

    /// The backend failed.
    #[display("Storage backend error: {}", _0)]
    Backend(String),
}

impl std::error::Error for StoreError {}

/// Persistence capability the session service is built on.
pub trait StateStore: std::fmt::Debug + Send + Sync {
    /// Loads the latest snapshot of a session, if it exists.
    fn load(&self, session_id: &str) -> Result<Option<StoredSession>, StoreError>;

    /// Writes a snapshot and returns its new revision.
    ///
    /// `expected = None` creates the session and fails with
    /// [`StoreError::AlreadyExists`] if the id is taken. `Some(revision)`
    /// replaces it only if the stored revision still equals `revision`,
    /// otherwise fails with [`StoreError::Conflict`].
    fn save(
        &self,
        session_id: &str,
        snapshot: &SessionSnapshot,
        expected: Option<Revision>,
    ) -> Result<Revision, StoreError>;

    /// Ids of every stored session.
    fn list(&self) -> Result<Vec<String>, StoreError>;
}

/// In-process store backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, StoredSession>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, StoredSession>>, StoreError> {
        self.sessions
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }
}

impl StateStore for MemoryStore {
    #[instrument(skip(self))]
    fn load(&self, session_id: &str) -> Result<Option<StoredSession>, StoreError> {
        let sessions = self.lock()?;
        let stored = sessions.get(session_id).cloned();
        if stored.is_none() {
            debug!("Session not found");
        }
        Ok(stored)
    }

    #[instrument(skip(self, snapshot), fields(phase = %snapshot.phase))]
    fn save(
        &self,
        session_id: &str,
        snapshot: &SessionSnapshot,
        expected: Option<Revision>,
    ) -> Result<Revision, StoreError> {
        let mut sessions = self.lock()?;
        let current = sessions.get(session_id).map(|s| s.revision);

        let revision = match (expected, current) {
            (None, None) => 1,
            (None, Some(_)) => {
                warn!("Session id already taken");
                return Err(StoreError::AlreadyExists(session_id.to_string()));
            }
            (Some(expected), Some(current)) if expected == current => current + 1,
            (Some(expected), current) => {
                warn!(expected, ?current, "Revision conflict");
                return Err(StoreError::Conflict {
                    session_id: session_id.to_string(),
                    expected,
                });
            }
        };

        sessions.insert(
            session_id.to_string(),
            StoredSession::new(snapshot.clone(), revision),
        );
        debug!(revision, "Snapshot saved");
        Ok(revision)
    }

    #[instrument(skip(self))]
    fn list(&self) -> Result<Vec<String>, StoreError> {
        let sessions = self.lock()?;
        let mut ids: Vec<_> = sessions.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
