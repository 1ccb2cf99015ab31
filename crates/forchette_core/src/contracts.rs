//! Contract-based validation for votes.
//!
//! Contracts define correctness through preconditions and postconditions:
//! {P} submit_vote {Q}.

use crate::error::SessionError;
use crate::invariants::{InvariantSet, SessionInvariants, describe};
use crate::typestate::SessionActive;
use crate::vote::VoteRequest;
use tracing::{instrument, warn};

// ─────────────────────────────────────────────────────────────
//  Contract Trait
// ─────────────────────────────────────────────────────────────

/// A contract defines preconditions and postconditions for state transitions.
pub trait Contract<S, A> {
    /// Checks preconditions before applying the action.
    fn pre(state: &S, action: &A) -> Result<(), SessionError>;

    /// Checks postconditions after applying the action.
    fn post(before: &S, after: &S) -> Result<(), SessionError>;
}

// ─────────────────────────────────────────────────────────────
//  Vote Preconditions
// ─────────────────────────────────────────────────────────────

/// Precondition: the vote names the cursor's slot.
pub struct SlotMatchesCursor;

impl SlotMatchesCursor {
    /// Rejects votes for any slot but the current one.
    #[instrument(skip(session))]
    pub fn check(request: &VoteRequest, session: &SessionActive) -> Result<(), SessionError> {
        let expected = session.current_slot();
        if request.slot != expected {
            warn!(%expected, got = %request.slot, "Vote for stale slot");
            Err(SessionError::SlotMismatch {
                expected,
                got: request.slot,
            })
        } else {
            Ok(())
        }
    }
}

/// Precondition: every category score is within range.
pub struct ScoresInRange;

impl ScoresInRange {
    /// Rejects malformed category scores.
    #[instrument(skip(_session))]
    pub fn check(request: &VoteRequest, _session: &SessionActive) -> Result<(), SessionError> {
        request.scores.check_range()
    }
}

/// Precondition: the slot holds no vote yet.
///
/// Unreachable while the cursor and ledger agree, but replayed or duplicated
/// snapshots can break that agreement.
pub struct SlotIsEmpty;

impl SlotIsEmpty {
    /// Rejects votes for filled slots.
    #[instrument(skip(session))]
    pub fn check(request: &VoteRequest, session: &SessionActive) -> Result<(), SessionError> {
        if session.ledger().contains(request.slot) {
            warn!(slot = %request.slot, "Slot already filled");
            Err(SessionError::DuplicateSlot(request.slot))
        } else {
            Ok(())
        }
    }
}

/// Composite precondition: a vote is legal if it targets the current,
/// empty slot with in-range scores.
pub struct LegalVote;

impl LegalVote {
    /// Validates all preconditions for a vote.
    #[instrument(skip(session))]
    pub fn check(request: &VoteRequest, session: &SessionActive) -> Result<(), SessionError> {
        SlotMatchesCursor::check(request, session)?;
        ScoresInRange::check(request, session)?;
        SlotIsEmpty::check(request, session)?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────
//  Vote Contract (Pre + Post)
// ─────────────────────────────────────────────────────────────

/// Contract for vote submissions.
///
/// Preconditions:
/// - Vote targets the cursor's slot
/// - Scores are in range
/// - Slot is empty
///
/// Postconditions:
/// - Ledger grew by exactly one vote
/// - All session invariants hold
pub struct VoteContract;

impl Contract<SessionActive, VoteRequest> for VoteContract {
    fn pre(session: &SessionActive, request: &VoteRequest) -> Result<(), SessionError> {
        LegalVote::check(request, session)
    }

    fn post(before: &SessionActive, after: &SessionActive) -> Result<(), SessionError> {
        if after.ledger().len() != before.ledger().len() + 1 {
            return Err(SessionError::InvariantViolation(
                "Postcondition failed: ledger did not grow by one vote".to_string(),
            ));
        }
        SessionInvariants::check_all(after).map_err(|violations| {
            SessionError::InvariantViolation(format!(
                "Postcondition failed: {}",
                describe(&violations)
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typestate::{SessionSetup, VoteOutcome};
    use crate::{CategoryScores, SessionConfig, SlotRef};

    fn started() -> SessionActive {
        SessionSetup::new(None, SessionConfig::default())
            .start()
            .expect("start")
    }

    #[test]
    fn test_precondition_current_slot() {
        let session = started();
        let request = VoteRequest::new(0, 0, CategoryScores::default(), false);
        assert!(VoteContract::pre(&session, &request).is_ok());
    }

    #[test]
    fn test_precondition_slot_mismatch() {
        let session = started();
        let request = VoteRequest::new(1, 0, CategoryScores::default(), false);
        assert_eq!(
            VoteContract::pre(&session, &request),
            Err(SessionError::SlotMismatch {
                expected: SlotRef::new(0, 0),
                got: SlotRef::new(1, 0)
            })
        );
    }

    #[test]
    fn test_precondition_score_range() {
        let session = started();
        let request = VoteRequest::new(0, 0, CategoryScores::new(5, 5, 5, 12), false);
        assert!(matches!(
            VoteContract::pre(&session, &request),
            Err(SessionError::ScoreOutOfRange { value: 12, .. })
        ));
    }

    #[test]
    fn test_precondition_detects_filled_slot_behind_stale_cursor() {
        let session = started();
        let request = VoteRequest::new(0, 0, CategoryScores::default(), false);
        if let Ok((_, VoteOutcome::Active(mut after))) = session.submit_vote(request) {
            // Rewind the cursor as a replayed snapshot might.
            after.cursor = crate::TurnCursor::start();
            assert_eq!(
                VoteContract::pre(&after, &request),
                Err(SessionError::DuplicateSlot(SlotRef::new(0, 0)))
            );
        } else {
            panic!("Expected active session");
        }
    }

    #[test]
    fn test_postcondition_holds_after_vote() {
        let session = started();
        let request = VoteRequest::new(0, 0, CategoryScores::default(), true);
        if let Ok((_, VoteOutcome::Active(after))) = session.clone().submit_vote(request) {
            assert!(VoteContract::post(&session, &after).is_ok());
        } else {
            panic!("Expected active session");
        }
    }

    #[test]
    fn test_postcondition_detects_unchanged_ledger() {
        let session = started();
        assert!(matches!(
            VoteContract::post(&session, &session),
            Err(SessionError::InvariantViolation(_))
        ));
    }
}
