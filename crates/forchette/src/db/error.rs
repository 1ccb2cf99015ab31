//! Errors raised by the SQLite session store.

use derive_more::{Display, Error};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::instrument;

use crate::store::StoreError;

/// Database failure, tagged with the session it concerned and the call site.
#[derive(Debug, Clone, Display, Error)]
#[display("Session store error{}: {} at {}:{}", session_label(session_id), message, file, line)]
pub struct DbError {
    /// Error message.
    pub message: String,
    /// Session being read or written, when the failure concerned one.
    pub session_id: Option<String>,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

fn session_label(session_id: &Option<String>) -> String {
    session_id
        .as_deref()
        .map(|id| format!(" for session '{}'", id))
        .unwrap_or_default()
}

impl DbError {
    /// Creates a store-wide error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            session_id: None,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Creates an error about one session with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn for_session(session_id: &str, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            session_id: Some(session_id.to_string()),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Maps a diesel failure on `session_id` into the store's error
    /// vocabulary. A primary-key collision means the id is taken.
    #[track_caller]
    pub fn classify(session_id: &str, err: DieselError) -> StoreError {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                StoreError::AlreadyExists(session_id.to_string())
            }
            other => Self::for_session(session_id, format!("Diesel error: {}", other)).into(),
        }
    }
}

impl From<diesel::result::Error> for DbError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        Self::new(format!("Diesel error: {}", err))
    }
}

impl From<diesel::ConnectionError> for DbError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::new(format!("Connection error: {}", err))
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        StoreError::Backend(err.to_string())
    }
}
