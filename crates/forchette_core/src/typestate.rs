//! Phase-specific typestate structs for voting sessions.
//!
//! Each phase is its own type with phase-specific fields. An active session
//! always has a validated config; a complete session always has a frozen
//! ranking, not an `Option`.

use crate::config::{SessionConfig, ValidConfig};
use crate::contracts::{Contract, VoteContract};
use crate::cursor::{Advance, TurnCursor};
use crate::error::SessionError;
use crate::invariants::{InvariantSet, SessionInvariants, SessionView, describe};
use crate::ledger::ScoreLedger;
use crate::ranking::{RankingEntry, compute_ranking, winner};
use crate::slot::SlotRef;
use crate::vote::{Vote, VoteRequest};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

// ─────────────────────────────────────────────────────────────
//  Setup Phase
// ─────────────────────────────────────────────────────────────

/// Session in setup: the config is an editable draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSetup {
    owner_id: Option<String>,
    config: SessionConfig,
}

impl SessionSetup {
    /// Creates a session in setup.
    #[instrument(skip(config))]
    pub fn new(owner_id: Option<String>, config: SessionConfig) -> Self {
        Self { owner_id, config }
    }

    /// Identity of the session's creator, passed through untouched.
    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// The draft config.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replaces the draft config. Validation waits until [`start`](Self::start).
    #[instrument(skip_all)]
    pub fn configure(self, config: SessionConfig) -> Self {
        debug!("Config replaced");
        Self { config, ..self }
    }

    /// Validates the config and starts voting at slot (0, 0) with an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if the draft does not validate.
    #[instrument(skip(self))]
    pub fn start(self) -> Result<SessionActive, SessionError> {
        let config = self.config.validate()?;
        info!(
            rounds = config.round_count(),
            participants = config.participant_count(),
            mode = %config.mode(),
            "Session started"
        );
        Ok(SessionActive {
            owner_id: self.owner_id,
            config,
            cursor: TurnCursor::start(),
            ledger: ScoreLedger::new(),
        })
    }
}

impl Default for SessionSetup {
    fn default() -> Self {
        Self::new(None, SessionConfig::default())
    }
}

// ─────────────────────────────────────────────────────────────
//  Active Phase
// ─────────────────────────────────────────────────────────────

/// Session accepting votes.
///
/// Invariants enforced by type:
/// - config is validated
/// - no ranking is frozen yet (that lives in [`SessionComplete`])
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionActive {
    pub(crate) owner_id: Option<String>,
    pub(crate) config: ValidConfig,
    pub(crate) cursor: TurnCursor,
    pub(crate) ledger: ScoreLedger,
}

impl SessionActive {
    /// Rebuilds an active session from persisted parts.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CorruptSnapshot`] if any session invariant fails.
    #[instrument(skip_all)]
    pub(crate) fn restore(
        owner_id: Option<String>,
        config: ValidConfig,
        cursor: TurnCursor,
        ledger: ScoreLedger,
    ) -> Result<Self, SessionError> {
        let session = Self {
            owner_id,
            config,
            cursor,
            ledger,
        };
        SessionInvariants::check_all(&session)
            .map_err(|violations| SessionError::CorruptSnapshot(describe(&violations)))?;
        Ok(session)
    }

    /// Submits a vote, consuming self and returning the next state.
    ///
    /// A bonus request that cannot be honored is recorded without the bonus;
    /// it is not an error.
    ///
    /// Contract enforcement:
    /// - Preconditions checked always ([`VoteContract`])
    /// - Postconditions checked in debug builds only
    ///
    /// # Errors
    ///
    /// [`SessionError::SlotMismatch`], [`SessionError::ScoreOutOfRange`] or
    /// [`SessionError::DuplicateSlot`]; the session is dropped unchanged, so
    /// callers keep their own copy when they need it back.
    #[instrument(skip(self), fields(cursor = %self.cursor.slot()))]
    pub fn submit_vote(self, request: VoteRequest) -> Result<(Vote, VoteOutcome), SessionError> {
        #[cfg(debug_assertions)]
        let before = self.clone();

        VoteContract::pre(&self, &request)?;

        let participant = request.slot.participant;
        let bonus_applied = request.wants_bonus
            && self
                .ledger
                .bonus_available(self.config.bonus_enabled(), participant);
        if request.wants_bonus && !bonus_applied {
            debug!(participant, "Bonus unavailable, recording vote without it");
        }

        let vote = Vote::new(request.slot, request.scores, bonus_applied);
        let mut session = self;
        session.ledger.record(vote)?;

        let next = session.cursor.advance(
            session.config.mode(),
            session.config.round_count(),
            session.config.participant_count(),
        );

        match next {
            Advance::Next(slot) => {
                session.cursor = TurnCursor::from(slot);

                #[cfg(debug_assertions)]
                VoteContract::post(&before, &session)?;

                debug!(next = %slot, total = vote.total(), "Vote accepted");
                Ok((vote, VoteOutcome::Active(session)))
            }
            Advance::Complete => {
                let complete = session.finish()?;
                Ok((vote, VoteOutcome::Complete(complete)))
            }
        }
    }

    fn finish(self) -> Result<SessionComplete, SessionError> {
        let ranking = compute_ranking(&self.config, &self.ledger);
        let complete = SessionComplete {
            owner_id: self.owner_id,
            cursor: TurnCursor::last(self.config.round_count(), self.config.participant_count()),
            config: self.config,
            ledger: self.ledger,
            ranking,
            reveal_index: 0,
        };

        #[cfg(debug_assertions)]
        SessionInvariants::check_all(&complete).map_err(|violations| {
            SessionError::InvariantViolation(format!(
                "Postcondition failed: {}",
                describe(&violations)
            ))
        })?;

        info!(winner = complete.winner(), votes = complete.ledger.len(), "Session complete");
        Ok(complete)
    }

    /// The slot awaiting a vote.
    pub fn current_slot(&self) -> SlotRef {
        self.cursor.slot()
    }

    /// Name of the round awaiting a vote.
    pub fn current_round_name(&self) -> &str {
        &self.config.round_names()[self.cursor.round()]
    }

    /// Name of the participant expected to vote.
    pub fn current_participant_name(&self) -> &str {
        &self.config.participant_names()[self.cursor.participant()]
    }

    /// Ranking of the votes recorded so far.
    #[instrument(skip(self))]
    pub fn provisional_ranking(&self) -> Vec<RankingEntry> {
        compute_ranking(&self.config, &self.ledger)
    }

    /// Identity of the session's creator.
    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// The validated config.
    pub fn config(&self) -> &ValidConfig {
        &self.config
    }

    /// The turn cursor.
    pub fn cursor(&self) -> TurnCursor {
        self.cursor
    }

    /// The score ledger.
    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }
}

impl SessionView for SessionActive {
    fn config(&self) -> &ValidConfig {
        &self.config
    }

    fn cursor(&self) -> TurnCursor {
        self.cursor
    }

    fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    fn filled_slots(&self) -> usize {
        self.cursor.ordinal(self.config.participant_count())
    }
}

// ─────────────────────────────────────────────────────────────
//  Complete Phase
// ─────────────────────────────────────────────────────────────

/// Session with every slot filled and the ranking frozen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionComplete {
    owner_id: Option<String>,
    config: ValidConfig,
    cursor: TurnCursor,
    ledger: ScoreLedger,
    ranking: Vec<RankingEntry>,
    reveal_index: usize,
}

impl SessionComplete {
    /// Rebuilds a complete session from persisted parts.
    ///
    /// The ranking is recomputed from the ledger; a persisted ranking that
    /// disagrees marks the snapshot corrupt.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CorruptSnapshot`] if an invariant fails, the
    /// cursor is not on the last slot, the ranking disagrees, or the reveal
    /// index runs past the ranking.
    #[instrument(skip_all)]
    pub(crate) fn restore(
        owner_id: Option<String>,
        config: ValidConfig,
        cursor: TurnCursor,
        ledger: ScoreLedger,
        ranking: &[RankingEntry],
        reveal_index: usize,
    ) -> Result<Self, SessionError> {
        let last = TurnCursor::last(config.round_count(), config.participant_count());
        if cursor != last {
            return Err(SessionError::CorruptSnapshot(format!(
                "complete session cursor at {} instead of {}",
                cursor.slot(),
                last.slot()
            )));
        }

        let mut session = Self {
            owner_id,
            config,
            cursor,
            ledger,
            ranking: Vec::new(),
            reveal_index,
        };
        // Totals are only summed once the invariants vouch for them.
        SessionInvariants::check_all(&session)
            .map_err(|violations| SessionError::CorruptSnapshot(describe(&violations)))?;

        let expected = compute_ranking(&session.config, &session.ledger);
        if expected.as_slice() != ranking {
            return Err(SessionError::CorruptSnapshot(
                "frozen ranking disagrees with recorded votes".to_string(),
            ));
        }
        if reveal_index > expected.len() {
            return Err(SessionError::CorruptSnapshot(format!(
                "reveal index {} past ranking of {}",
                reveal_index,
                expected.len()
            )));
        }
        session.ranking = expected;
        Ok(session)
    }

    /// The frozen ranking, best first.
    pub fn ranking(&self) -> &[RankingEntry] {
        &self.ranking
    }

    /// Name of the top-ranked round.
    pub fn winner(&self) -> &str {
        winner(&self.ranking).unwrap_or_default()
    }

    /// How many ranking entries have been revealed.
    pub fn reveal_index(&self) -> usize {
        self.reveal_index
    }

    /// Whether the whole ranking has been revealed.
    pub fn fully_revealed(&self) -> bool {
        self.reveal_index >= self.ranking.len()
    }

    /// Reveals one more ranking entry; stays put once all are shown.
    #[instrument(skip(self), fields(reveal_index = self.reveal_index))]
    pub fn reveal_next(self) -> Self {
        if self.fully_revealed() {
            debug!("Ranking already fully revealed");
            return self;
        }
        let reveal_index = self.reveal_index + 1;
        debug!(reveal_index, "Reveal step");
        Self {
            reveal_index,
            ..self
        }
    }

    /// Returns to setup with an empty ledger.
    #[instrument(skip(self))]
    pub fn restart(self, mode: ResetMode) -> SessionSetup {
        let config = match mode {
            ResetMode::KeepConfig => SessionConfig::from(&self.config),
            ResetMode::FreshDefaults => SessionConfig::default(),
        };
        info!(?mode, "Session reset");
        SessionSetup::new(self.owner_id, config)
    }

    /// Identity of the session's creator.
    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// The validated config.
    pub fn config(&self) -> &ValidConfig {
        &self.config
    }

    /// The cursor, frozen on the last slot.
    pub fn cursor(&self) -> TurnCursor {
        self.cursor
    }

    /// The frozen ledger.
    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }
}

impl SessionView for SessionComplete {
    fn config(&self) -> &ValidConfig {
        &self.config
    }

    fn cursor(&self) -> TurnCursor {
        self.cursor
    }

    fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    fn filled_slots(&self) -> usize {
        self.config.slot_count()
    }
}

// ─────────────────────────────────────────────────────────────
//  Transition Types
// ─────────────────────────────────────────────────────────────

/// Result of submitting a vote.
#[derive(Debug)]
pub enum VoteOutcome {
    /// Voting continues.
    Active(SessionActive),
    /// The last slot was filled.
    Complete(SessionComplete),
}

/// What happens to the config when a finished session is reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResetMode {
    /// Keep the previous session's (validated) config.
    #[default]
    KeepConfig,
    /// Start over from the stock defaults.
    FreshDefaults,
}
