//! Session service: loads a snapshot, applies a command, saves it back.
//!
//! Writes are optimistic. Each save names the revision it read; when another
//! writer got there first the command is re-applied to the fresh snapshot.
//! Because [`SessionSnapshot::apply`] validates against the fresh state, a
//! vote for a slot someone else already filled comes back as a stale-slot
//! error instead of overwriting the earlier vote.

use derive_more::Display;
use forchette_core::{
    Applied, Command, CurrentTurn, Phase, RankingEntry, ResetMode, Session, SessionConfig,
    SessionError, SessionSnapshot, Vote, VoteRequest,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::store::{Revision, StateStore, StoreError, StoredSession};

/// Default number of re-applies after a revision conflict.
pub const DEFAULT_CONFLICT_RETRIES: u32 = 3;

const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Canonical form of a session id: uppercase with all whitespace removed,
/// so codes typed as `" ab c1 "` and `"ABC1"` name the same session.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidSessionId`] if nothing remains.
pub fn normalize_session_id(raw: &str) -> Result<String, ServiceError> {
    let id: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect();
    if id.is_empty() {
        return Err(ServiceError::InvalidSessionId(raw.to_string()));
    }
    Ok(id)
}

/// Notification sent to subscribers after every successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUpdate {
    /// The session written.
    pub session_id: String,
    /// Revision of the write.
    pub revision: Revision,
    /// Phase after the write.
    pub phase: Phase,
}

/// Failure of a service operation.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ServiceError {
    /// The command was rejected by the session rules.
    #[display("{}", _0)]
    Session(SessionError),

    /// No session with this id.
    #[display("Session '{}' not found", _0)]
    NotFound(String),

    /// The id is empty once whitespace is stripped.
    #[display("Session id '{}' is empty", _0)]
    InvalidSessionId(String),

    /// The store failed.
    #[display("{}", _0)]
    Store(StoreError),

    /// Every attempt lost the write race.
    #[display("Session '{}' stayed contended after {} attempts", session_id, attempts)]
    ConflictRetriesExhausted {
        /// The contended session.
        session_id: String,
        /// Attempts made.
        attempts: u32,
    },
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Session(e) => Some(e),
            ServiceError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SessionError> for ServiceError {
    fn from(err: SessionError) -> Self {
        ServiceError::Session(err)
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::Store(err)
    }
}

/// Runs session commands against a [`StateStore`].
#[derive(Debug, Clone)]
pub struct SessionService {
    store: Arc<dyn StateStore>,
    updates: broadcast::Sender<SessionUpdate>,
    conflict_retries: u32,
}

impl SessionService {
    /// Creates a service over the given store.
    #[instrument(skip(store))]
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            store,
            updates,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }

    /// Sets how many times a contended write is re-applied.
    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }

    /// Receives a [`SessionUpdate`] for every write made through this
    /// service or its clones.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    /// Creates a session in setup.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] with [`StoreError::AlreadyExists`] if
    /// the id is taken, or [`ServiceError::InvalidSessionId`] if it is blank.
    #[instrument(skip(self, config))]
    pub fn create_session(
        &self,
        session_id: &str,
        owner_id: Option<String>,
        config: SessionConfig,
    ) -> Result<SessionSnapshot, ServiceError> {
        let session_id = normalize_session_id(session_id)?;
        let snapshot = Session::create(owner_id, config).snapshot();
        let revision = self.store.save(&session_id, &snapshot, None)?;
        info!(%session_id, "Session created");
        self.publish(&session_id, revision, snapshot.phase);
        Ok(snapshot)
    }

    /// Loads a session with its revision.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for an unknown id.
    #[instrument(skip(self))]
    pub fn load(&self, session_id: &str) -> Result<StoredSession, ServiceError> {
        let session_id = normalize_session_id(session_id)?;
        self.store
            .load(&session_id)?
            .ok_or(ServiceError::NotFound(session_id))
    }

    /// The latest snapshot of a session.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for an unknown id.
    pub fn get(&self, session_id: &str) -> Result<SessionSnapshot, ServiceError> {
        Ok(self.load(session_id)?.into_parts().0)
    }

    /// Ids of every stored session.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] if the store fails.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<String>, ServiceError> {
        Ok(self.store.list()?)
    }

    /// Replaces the draft config of a session in setup.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Session`] if the session is not in setup.
    #[instrument(skip(self, config))]
    pub fn configure(
        &self,
        session_id: &str,
        config: SessionConfig,
    ) -> Result<SessionSnapshot, ServiceError> {
        Ok(self.execute(session_id, Command::Configure { config })?.snapshot)
    }

    /// Validates the config and begins voting.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Session`] if the config is invalid or the
    /// session is not in setup.
    #[instrument(skip(self))]
    pub fn start_session(&self, session_id: &str) -> Result<SessionSnapshot, ServiceError> {
        Ok(self.execute(session_id, Command::Start)?.snapshot)
    }

    /// Records a vote for the current slot.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Session`] if the vote is illegal, including
    /// when a concurrent writer already filled the slot.
    #[instrument(skip(self), fields(slot = %request.slot))]
    pub fn submit_vote(
        &self,
        session_id: &str,
        request: VoteRequest,
    ) -> Result<(SessionSnapshot, Vote), ServiceError> {
        let applied = self.execute(session_id, Command::SubmitVote { request })?;
        let vote = applied.vote.ok_or_else(|| {
            SessionError::InvariantViolation("vote command recorded no vote".to_string())
        })?;
        Ok((applied.snapshot, vote))
    }

    /// Returns a complete session to setup.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Session`] if the session is not complete.
    #[instrument(skip(self))]
    pub fn reset_session(
        &self,
        session_id: &str,
        mode: ResetMode,
    ) -> Result<SessionSnapshot, ServiceError> {
        Ok(self.execute(session_id, Command::Reset { mode })?.snapshot)
    }

    /// Reveals one more ranking entry.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Session`] if the session is not complete.
    #[instrument(skip(self))]
    pub fn reveal_next(&self, session_id: &str) -> Result<SessionSnapshot, ServiceError> {
        Ok(self.execute(session_id, Command::RevealNext)?.snapshot)
    }

    /// The ranking: provisional while active, frozen once complete.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Session`] in setup.
    #[instrument(skip(self))]
    pub fn get_ranking(&self, session_id: &str) -> Result<Vec<RankingEntry>, ServiceError> {
        let session = Session::try_from(self.get(session_id)?)?;
        Ok(session.ranking()?)
    }

    /// The slot awaiting a vote with who votes on what, if the session is
    /// active.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for an unknown id.
    #[instrument(skip(self))]
    pub fn get_current_slot(&self, session_id: &str) -> Result<Option<CurrentTurn>, ServiceError> {
        let session = Session::try_from(self.get(session_id)?)?;
        Ok(session.current_turn())
    }

    /// Applies a command with optimistic concurrency.
    ///
    /// # Errors
    ///
    /// Returns the command's [`SessionError`], [`ServiceError::NotFound`],
    /// or [`ServiceError::ConflictRetriesExhausted`] once the retries are spent.
    #[instrument(skip(self, command), fields(command = command.name()))]
    pub fn execute(&self, session_id: &str, command: Command) -> Result<Applied, ServiceError> {
        let session_id = normalize_session_id(session_id)?;
        let attempts = self.conflict_retries + 1;

        for attempt in 1..=attempts {
            let (snapshot, revision) = self.load(&session_id)?.into_parts();
            let applied = snapshot.apply(command.clone()).map_err(|e| {
                if e.is_stale() {
                    info!(attempt, error = %e, "Slot already taken by another writer");
                }
                e
            })?;

            match self.store.save(&session_id, &applied.snapshot, Some(revision)) {
                Ok(revision) => {
                    debug!(attempt, revision, phase = %applied.snapshot.phase, "Command applied");
                    self.publish(&session_id, revision, applied.snapshot.phase);
                    return Ok(applied);
                }
                Err(StoreError::Conflict { .. }) => {
                    warn!(attempt, "Lost write race, re-applying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::ConflictRetriesExhausted {
            session_id,
            attempts,
        })
    }

    fn publish(&self, session_id: &str, revision: Revision, phase: Phase) {
        let update = SessionUpdate {
            session_id: session_id.to_string(),
            revision,
            phase,
        };
        if self.updates.send(update).is_err() {
            debug!("No update subscribers");
        }
    }
}
