//! The session aggregate and its persisted snapshot form.
//!
//! [`Session`] wraps the three typestate phases behind one value so callers
//! can load a snapshot, apply an operation and write the result back without
//! knowing the phase up front. Every operation consumes the session and
//! returns a new one, or an error that leaves the caller's snapshot as it was.

use crate::config::{SessionConfig, ValidConfig};
use crate::cursor::TurnCursor;
use crate::error::SessionError;
use crate::ledger::ScoreLedger;
use crate::ranking::RankingEntry;
use crate::slot::{SlotKey, SlotRef};
use crate::typestate::{ResetMode, SessionActive, SessionComplete, SessionSetup, VoteOutcome};
use crate::vote::{Vote, VoteRequest};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument, warn};

/// The turn an active session is waiting on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CurrentTurn {
    /// Slot awaiting a vote.
    pub slot: SlotRef,
    /// Name of the round being voted.
    pub round_name: String,
    /// Name of the participant expected to vote.
    pub participant_name: String,
}

/// Lifecycle phase of a session.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    /// Config is editable; no votes.
    Setup,
    /// Votes are being collected.
    Active,
    /// Every slot is filled and the ranking is frozen.
    Complete,
}

/// A session in any phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    /// Config being edited.
    Setup(SessionSetup),
    /// Votes being collected.
    Active(SessionActive),
    /// Ranking frozen.
    Complete(SessionComplete),
}

impl Session {
    /// Creates a new session in setup.
    #[instrument(skip(config))]
    pub fn create(owner_id: Option<String>, config: SessionConfig) -> Self {
        Session::Setup(SessionSetup::new(owner_id, config))
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        match self {
            Session::Setup(_) => Phase::Setup,
            Session::Active(_) => Phase::Active,
            Session::Complete(_) => Phase::Complete,
        }
    }

    /// Identity of the session's creator.
    pub fn owner_id(&self) -> Option<&str> {
        match self {
            Session::Setup(s) => s.owner_id(),
            Session::Active(s) => s.owner_id(),
            Session::Complete(s) => s.owner_id(),
        }
    }

    fn invalid_phase(&self, expected: Phase) -> SessionError {
        warn!(%expected, actual = %self.phase(), "Operation rejected in this phase");
        SessionError::InvalidPhase {
            expected,
            actual: self.phase(),
        }
    }

    /// Replaces the draft config while in setup.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidPhase`] outside setup.
    #[instrument(skip_all, fields(phase = %self.phase()))]
    pub fn configure(self, config: SessionConfig) -> Result<Session, SessionError> {
        match self {
            Session::Setup(setup) => Ok(Session::Setup(setup.configure(config))),
            other => Err(other.invalid_phase(Phase::Setup)),
        }
    }

    /// Moves from setup to active.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidPhase`] outside setup and
    /// [`SessionError::Config`] if the config does not validate.
    #[instrument(skip(self), fields(phase = %self.phase()))]
    pub fn start(self) -> Result<Session, SessionError> {
        match self {
            Session::Setup(setup) => setup.start().map(Session::Active),
            other => Err(other.invalid_phase(Phase::Setup)),
        }
    }

    /// Records a vote for the current slot and advances the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidPhase`] unless active, plus every
    /// error of [`SessionActive::submit_vote`].
    #[instrument(skip(self), fields(phase = %self.phase()))]
    pub fn submit_vote(self, request: VoteRequest) -> Result<(Session, Vote), SessionError> {
        match self {
            Session::Active(active) => {
                let (vote, outcome) = active.submit_vote(request)?;
                let next = match outcome {
                    VoteOutcome::Active(active) => Session::Active(active),
                    VoteOutcome::Complete(complete) => Session::Complete(complete),
                };
                Ok((next, vote))
            }
            other => Err(other.invalid_phase(Phase::Active)),
        }
    }

    /// Returns a complete session to setup with an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidPhase`] unless complete.
    #[instrument(skip(self), fields(phase = %self.phase()))]
    pub fn reset(self, mode: ResetMode) -> Result<Session, SessionError> {
        match self {
            Session::Complete(complete) => Ok(Session::Setup(complete.restart(mode))),
            other => Err(other.invalid_phase(Phase::Complete)),
        }
    }

    /// Reveals one more entry of a complete session's ranking.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidPhase`] unless complete.
    #[instrument(skip(self), fields(phase = %self.phase()))]
    pub fn reveal_next(self) -> Result<Session, SessionError> {
        match self {
            Session::Complete(complete) => Ok(Session::Complete(complete.reveal_next())),
            other => Err(other.invalid_phase(Phase::Complete)),
        }
    }

    /// The ranking: provisional while active, frozen once complete.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidPhase`] in setup, where no votes exist.
    #[instrument(skip(self), fields(phase = %self.phase()))]
    pub fn ranking(&self) -> Result<Vec<RankingEntry>, SessionError> {
        match self {
            Session::Setup(_) => Err(self.invalid_phase(Phase::Complete)),
            Session::Active(active) => Ok(active.provisional_ranking()),
            Session::Complete(complete) => Ok(complete.ranking().to_vec()),
        }
    }

    /// The slot awaiting a vote; `None` unless active.
    pub fn current_slot(&self) -> Option<SlotRef> {
        match self {
            Session::Active(active) => Some(active.current_slot()),
            _ => None,
        }
    }

    /// The slot awaiting a vote with its round and participant names;
    /// `None` unless active.
    pub fn current_turn(&self) -> Option<CurrentTurn> {
        match self {
            Session::Active(active) => Some(CurrentTurn {
                slot: active.current_slot(),
                round_name: active.current_round_name().to_string(),
                participant_name: active.current_participant_name().to_string(),
            }),
            _ => None,
        }
    }

    /// Serializable form of this session.
    #[instrument(skip(self), fields(phase = %self.phase()))]
    pub fn snapshot(&self) -> SessionSnapshot {
        match self {
            Session::Setup(setup) => SessionSnapshot {
                owner_id: setup.owner_id().map(str::to_string),
                phase: Phase::Setup,
                config: setup.config().clone(),
                cursor: TurnCursor::start(),
                votes: BTreeMap::new(),
                bonus_used: BTreeSet::new(),
                ranking: None,
                winner: None,
                reveal_index: 0,
            },
            Session::Active(active) => SessionSnapshot {
                owner_id: active.owner_id().map(str::to_string),
                phase: Phase::Active,
                config: SessionConfig::from(active.config()),
                cursor: active.cursor(),
                votes: active.ledger().votes_by_slot().clone(),
                bonus_used: active.ledger().bonus_users().clone(),
                ranking: None,
                winner: None,
                reveal_index: 0,
            },
            Session::Complete(complete) => SessionSnapshot {
                owner_id: complete.owner_id().map(str::to_string),
                phase: Phase::Complete,
                config: SessionConfig::from(complete.config()),
                cursor: complete.cursor(),
                votes: complete.ledger().votes_by_slot().clone(),
                bonus_used: complete.ledger().bonus_users().clone(),
                ranking: Some(complete.ranking().to_vec()),
                winner: Some(complete.winner().to_string()),
                reveal_index: complete.reveal_index(),
            },
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::Setup(SessionSetup::default())
    }
}

/// Plain serializable record of a session.
///
/// This is the shape handed to storage. `votes` is a flat map keyed
/// `"{round}:{participant}"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SessionSnapshot {
    /// Identity of the session's creator.
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Lifecycle phase.
    pub phase: Phase,
    /// Draft config in setup, validated config afterwards.
    pub config: SessionConfig,
    /// Turn cursor.
    pub cursor: TurnCursor,
    /// Recorded votes by slot key.
    #[serde(default)]
    pub votes: BTreeMap<SlotKey, Vote>,
    /// Participants who spent their bonus.
    #[serde(default)]
    pub bonus_used: BTreeSet<usize>,
    /// Frozen ranking, present once complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranking: Option<Vec<RankingEntry>>,
    /// Top-ranked round name, present once complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    /// Ranking entries revealed so far.
    #[serde(default)]
    pub reveal_index: usize,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Session::default().snapshot()
    }
}

impl TryFrom<SessionSnapshot> for Session {
    type Error = SessionError;

    /// Rebuilds a session from a snapshot, rejecting states no sequence of
    /// operations could have produced.
    #[instrument(skip_all, fields(phase = %snapshot.phase, votes = snapshot.votes.len()))]
    fn try_from(snapshot: SessionSnapshot) -> Result<Self, Self::Error> {
        let SessionSnapshot {
            owner_id,
            phase,
            config,
            cursor,
            votes,
            bonus_used,
            ranking,
            winner,
            reveal_index,
        } = snapshot;

        let session = match phase {
            Phase::Setup => {
                if !votes.is_empty() || !bonus_used.is_empty() {
                    return Err(corrupt("setup session carries votes"));
                }
                Session::Setup(SessionSetup::new(owner_id, config))
            }
            Phase::Active => {
                if ranking.is_some() {
                    return Err(corrupt("active session carries a frozen ranking"));
                }
                Session::Active(SessionActive::restore(
                    owner_id,
                    validated(phase, &config)?,
                    cursor,
                    ScoreLedger::from_parts(votes, bonus_used),
                )?)
            }
            Phase::Complete => {
                let ranking = ranking.ok_or_else(|| corrupt("complete session has no ranking"))?;
                let complete = SessionComplete::restore(
                    owner_id,
                    validated(phase, &config)?,
                    cursor,
                    ScoreLedger::from_parts(votes, bonus_used),
                    &ranking,
                    reveal_index,
                )?;
                if winner.as_deref().is_some_and(|w| w != complete.winner()) {
                    return Err(corrupt("winner disagrees with ranking"));
                }
                Session::Complete(complete)
            }
        };

        debug!("Snapshot restored");
        Ok(session)
    }
}

fn validated(phase: Phase, config: &SessionConfig) -> Result<ValidConfig, SessionError> {
    config
        .validate()
        .map_err(|e| corrupt(format!("{} session has invalid config: {}", phase, e)))
}

fn corrupt(message: impl Into<String>) -> SessionError {
    let message = message.into();
    warn!(%message, "Rejected snapshot");
    SessionError::CorruptSnapshot(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vote::CategoryScores;

    fn two_by_two() -> Session {
        Session::create(
            Some("owner-1".into()),
            SessionConfig::new(
                vec!["Pizza Place".into(), "Sushi Bar".into()],
                vec!["Alice".into(), "Bob".into()],
            ),
        )
    }

    fn vote(session: Session, round: usize, participant: usize) -> Session {
        session
            .submit_vote(VoteRequest::new(round, participant, CategoryScores::default(), false))
            .expect("vote")
            .0
    }

    #[test]
    fn test_vote_in_setup_is_invalid_phase() {
        let request = VoteRequest::new(0, 0, CategoryScores::default(), false);
        let result = two_by_two().submit_vote(request);
        assert_eq!(
            result.unwrap_err(),
            SessionError::InvalidPhase {
                expected: Phase::Active,
                actual: Phase::Setup
            }
        );
    }

    #[test]
    fn test_start_twice_is_invalid_phase() {
        let session = two_by_two().start().expect("start");
        assert!(matches!(
            session.start(),
            Err(SessionError::InvalidPhase {
                actual: Phase::Active,
                ..
            })
        ));
    }

    #[test]
    fn test_reset_only_from_complete() {
        let session = two_by_two().start().expect("start");
        assert!(matches!(
            session.reset(ResetMode::KeepConfig),
            Err(SessionError::InvalidPhase {
                expected: Phase::Complete,
                ..
            })
        ));
    }

    #[test]
    fn test_configure_only_in_setup() {
        let session = two_by_two().configure(SessionConfig::default()).expect("configure");
        assert_eq!(session.phase(), Phase::Setup);
        let active = session.start().expect("start");
        assert!(active.configure(SessionConfig::default()).is_err());
    }

    #[test]
    fn test_ranking_unavailable_in_setup() {
        assert!(two_by_two().ranking().is_err());
    }

    #[test]
    fn test_snapshot_round_trip_each_phase() {
        let setup = two_by_two();
        let active = vote(setup.clone().start().expect("start"), 0, 0);
        let complete = vote(vote(vote(active.clone(), 0, 1), 1, 0), 1, 1);
        assert_eq!(complete.phase(), Phase::Complete);

        for session in [setup, active, complete] {
            let json = serde_json::to_string(&session.snapshot()).expect("serialize");
            let snapshot: SessionSnapshot = serde_json::from_str(&json).expect("deserialize");
            let restored = Session::try_from(snapshot).expect("restore");
            assert_eq!(restored, session);
        }
    }

    #[test]
    fn test_snapshot_votes_are_flat_keys() {
        let active = vote(two_by_two().start().expect("start"), 0, 0);
        let json = serde_json::to_value(active.snapshot()).expect("serialize");
        assert!(json["votes"]["0:0"].is_object());
        assert_eq!(json["phase"], "active");
    }

    #[test]
    fn test_corrupt_setup_with_votes_rejected() {
        let mut snapshot = vote(two_by_two().start().expect("start"), 0, 0).snapshot();
        snapshot.phase = Phase::Setup;
        assert!(matches!(
            Session::try_from(snapshot),
            Err(SessionError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn test_corrupt_active_cursor_rejected() {
        let mut snapshot = vote(two_by_two().start().expect("start"), 0, 0).snapshot();
        snapshot.cursor = TurnCursor::start();
        assert!(matches!(
            Session::try_from(snapshot),
            Err(SessionError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn test_corrupt_ranking_rejected() {
        let active = vote(two_by_two().start().expect("start"), 0, 0);
        let complete = vote(vote(vote(active, 0, 1), 1, 0), 1, 1);
        let mut snapshot = complete.snapshot();
        if let Some(ranking) = snapshot.ranking.as_mut() {
            ranking.reverse();
        }
        assert!(matches!(
            Session::try_from(snapshot),
            Err(SessionError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn test_phase_string_forms() {
        assert_eq!(Phase::Complete.to_string(), "complete");
        assert_eq!("active".parse::<Phase>(), Ok(Phase::Active));
    }
}
