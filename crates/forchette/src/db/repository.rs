//! Diesel-backed session store.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use forchette_core::SessionSnapshot;
use tracing::{debug, info, instrument, warn};

use crate::db::models::{encode_snapshot, phase_column};
use crate::db::{DbError, NewSessionRow, SessionRow, schema};
use crate::store::{Revision, StateStore, StoreError, StoredSession};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Milliseconds a connection waits on a locked database before failing.
const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Session store persisting snapshots as JSON in SQLite.
///
/// Opens a fresh connection per call, so the store is cheap to clone and
/// share across threads.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db_path: String,
}

impl SqliteStore {
    /// Opens the database at `db_path`, applying pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the database cannot be opened or migrated.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn open(db_path: String) -> Result<Self, DbError> {
        info!(path = %db_path, "Opening session store");
        let store = Self { db_path };
        let mut conn = store.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| DbError::new(format!("Migrations failed: {}", e)))?;
        debug!(count = applied.len(), "Migrations applied");
        Ok(store)
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))?;
        conn.batch_execute(&format!("PRAGMA busy_timeout = {};", BUSY_TIMEOUT_MS))?;
        Ok(conn)
    }

    /// Fetches the raw row for a session.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_row(&self, session_id: &str) -> Result<Option<SessionRow>, DbError> {
        let mut conn = self.connection()?;
        let row = schema::sessions::table
            .filter(schema::sessions::id.eq(session_id))
            .select(SessionRow::as_select())
            .first(&mut conn)
            .optional()
            .map_err(|e| {
                DbError::for_session(session_id, format!("Failed to read row: {}", e))
            })?;
        Ok(row)
    }

    /// Rows owned by `owner_id`, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn rows_for_owner(&self, owner_id: &str) -> Result<Vec<SessionRow>, DbError> {
        let mut conn = self.connection()?;
        let rows = schema::sessions::table
            .filter(schema::sessions::owner_id.eq(owner_id))
            .order(schema::sessions::updated_at.desc())
            .select(SessionRow::as_select())
            .load(&mut conn)?;
        debug!(count = rows.len(), "Owner sessions loaded");
        Ok(rows)
    }

    #[instrument(skip(self, snapshot))]
    fn insert(&self, session_id: &str, snapshot: &SessionSnapshot) -> Result<Revision, StoreError> {
        let row = NewSessionRow::encode(session_id, snapshot)?;
        let mut conn = self.connection()?;

        diesel::insert_into(schema::sessions::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| {
                let err = DbError::classify(session_id, e);
                warn!(session_id, error = %err, "Insert rejected");
                err
            })?;
        info!(session_id, "Session created");
        Ok(1)
    }

    #[instrument(skip(self, snapshot))]
    fn update(
        &self,
        session_id: &str,
        snapshot: &SessionSnapshot,
        expected: Revision,
    ) -> Result<Revision, StoreError> {
        use schema::sessions::dsl;

        let json = encode_snapshot(session_id, snapshot)?;
        let next = expected + 1;
        let (expected_column, next_column) = match (i64::try_from(expected), i64::try_from(next)) {
            (Ok(e), Ok(n)) => (e, n),
            _ => {
                let message = format!("revision {} exceeds the column range", expected);
                return Err(DbError::for_session(session_id, message).into());
            }
        };

        let mut conn = self.connection()?;
        let updated = diesel::update(
            dsl::sessions
                .filter(dsl::id.eq(session_id))
                .filter(dsl::revision.eq(expected_column)),
        )
        .set((
            dsl::owner_id.eq(snapshot.owner_id.clone()),
            dsl::phase.eq(phase_column(snapshot.phase)),
            dsl::snapshot.eq(json),
            dsl::revision.eq(next_column),
            dsl::updated_at.eq(chrono::Utc::now().naive_utc()),
        ))
        .execute(&mut conn)
        .map_err(|e| DbError::classify(session_id, e))?;

        if updated == 0 {
            warn!(session_id, expected, "Revision conflict");
            return Err(StoreError::Conflict {
                session_id: session_id.to_string(),
                expected,
            });
        }

        debug!(session_id, revision = next, "Snapshot saved");
        Ok(next)
    }
}

impl StateStore for SqliteStore {
    #[instrument(skip(self))]
    fn load(&self, session_id: &str) -> Result<Option<StoredSession>, StoreError> {
        match self.get_row(session_id)? {
            Some(row) => row.decode().map(Some),
            None => {
                debug!("Session not found");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, snapshot), fields(phase = %snapshot.phase))]
    fn save(
        &self,
        session_id: &str,
        snapshot: &SessionSnapshot,
        expected: Option<Revision>,
    ) -> Result<Revision, StoreError> {
        match expected {
            None => self.insert(session_id, snapshot),
            Some(expected) => self.update(session_id, snapshot, expected),
        }
    }

    #[instrument(skip(self))]
    fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection()?;
        let ids = schema::sessions::table
            .select(schema::sessions::id)
            .order(schema::sessions::id.asc())
            .load::<String>(&mut conn)
            .map_err(DbError::from)?;
        Ok(ids)
    }
}
