//! Row types for the `sessions` table.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use forchette_core::{Phase, SessionSnapshot};
use tracing::instrument;

use crate::db::schema;
use crate::store::{Revision, StoreError, StoredSession};

/// A persisted session record.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters)]
#[diesel(table_name = schema::sessions)]
pub struct SessionRow {
    id: String,
    owner_id: Option<String>,
    phase: String,
    snapshot: String,
    revision: i64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

impl SessionRow {
    /// Decodes the stored JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] if the JSON does not decode or the
    /// revision column is negative.
    #[instrument(skip(self), fields(id = %self.id, revision = self.revision))]
    pub fn decode(&self) -> Result<StoredSession, StoreError> {
        let malformed = |message: String| StoreError::Malformed {
            session_id: self.id.clone(),
            message,
        };
        let snapshot: SessionSnapshot =
            serde_json::from_str(&self.snapshot).map_err(|e| malformed(e.to_string()))?;
        let revision = Revision::try_from(self.revision)
            .map_err(|_| malformed(format!("negative revision {}", self.revision)))?;
        Ok(StoredSession::new(snapshot, revision))
    }
}

/// Insertable session record for a newly created session.
#[derive(Debug, Clone, Insertable, new, Getters)]
#[diesel(table_name = schema::sessions)]
pub struct NewSessionRow {
    id: String,
    owner_id: Option<String>,
    phase: String,
    snapshot: String,
    revision: i64,
}

impl NewSessionRow {
    /// Encodes a snapshot for its first write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] if the snapshot does not serialize.
    #[instrument(skip(snapshot))]
    pub fn encode(id: &str, snapshot: &SessionSnapshot) -> Result<Self, StoreError> {
        let json = encode_snapshot(id, snapshot)?;
        Ok(Self::new(
            id.to_string(),
            snapshot.owner_id.clone(),
            phase_column(snapshot.phase),
            json,
            1,
        ))
    }
}

/// Serializes a snapshot for the `snapshot` column.
pub(crate) fn encode_snapshot(id: &str, snapshot: &SessionSnapshot) -> Result<String, StoreError> {
    serde_json::to_string(snapshot).map_err(|e| StoreError::Malformed {
        session_id: id.to_string(),
        message: e.to_string(),
    })
}

/// The `phase` column value.
pub(crate) fn phase_column(phase: Phase) -> String {
    phase.to_string()
}
