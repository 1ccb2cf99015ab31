//! First-class invariants for voting sessions.
//!
//! Invariants are logical properties that must hold for every active or
//! complete session. They back the vote postconditions and the checks run
//! on snapshots loaded from storage.

use crate::config::ValidConfig;
use crate::cursor::TurnCursor;
use crate::ledger::ScoreLedger;

/// A logical property that must hold for a given state.
pub trait Invariant<S> {
    /// Checks if the invariant holds for the given state.
    fn holds(state: &S) -> bool;

    /// Human-readable description of the invariant.
    fn description() -> &'static str;
}

/// Violation of an invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub description: String,
}

impl InvariantViolation {
    /// Creates a new invariant violation.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A set of invariants that can be checked together.
///
/// Implemented for tuples of invariants.
pub trait InvariantSet<S> {
    /// Checks all invariants in the set, collecting every violation.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

macro_rules! impl_invariant_set {
    ($($inv:ident),+) => {
        impl<S, $($inv),+> InvariantSet<S> for ($($inv,)+)
        where
            $($inv: Invariant<S>,)+
        {
            fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
                let mut violations = Vec::new();
                $(
                    if !<$inv as Invariant<S>>::holds(state) {
                        let description = <$inv as Invariant<S>>::description();
                        violations.push(InvariantViolation::new(description));
                    }
                )+
                if violations.is_empty() {
                    Ok(())
                } else {
                    Err(violations)
                }
            }
        }
    };
}

impl_invariant_set!(I1, I2);
impl_invariant_set!(I1, I2, I3);
impl_invariant_set!(I1, I2, I3, I4);

/// Read access to the parts of a session the invariants inspect.
pub trait SessionView {
    /// The validated configuration.
    fn config(&self) -> &ValidConfig;
    /// The turn cursor.
    fn cursor(&self) -> TurnCursor;
    /// The score ledger.
    fn ledger(&self) -> &ScoreLedger;
    /// How many slots, in traversal order, must already hold a vote.
    fn filled_slots(&self) -> usize;
}

pub mod bonus_once;
pub mod consistent_totals;
pub mod cursor_bounds;
pub mod exactly_once;

pub use bonus_once::BonusOnceInvariant;
pub use consistent_totals::ConsistentTotalsInvariant;
pub use cursor_bounds::CursorInBoundsInvariant;
pub use exactly_once::ExactlyOnceInvariant;

/// All session invariants as a composable set.
pub type SessionInvariants = (
    CursorInBoundsInvariant,
    ExactlyOnceInvariant,
    BonusOnceInvariant,
    ConsistentTotalsInvariant,
);

/// Joins violation descriptions into one message.
pub(crate) fn describe(violations: &[InvariantViolation]) -> String {
    violations
        .iter()
        .map(|v| v.description.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CategoryScores, SessionActive, SessionConfig, SessionSetup, VoteOutcome, VoteRequest,
    };

    fn two_by_two() -> SessionConfig {
        SessionConfig::new(
            vec!["Pizza Place".into(), "Sushi Bar".into()],
            vec!["Alice".into(), "Bob".into()],
        )
    }

    #[test]
    fn test_invariant_set_holds_for_fresh_session() {
        let session = SessionSetup::new(None, two_by_two()).start().expect("start");
        assert!(SessionInvariants::check_all(&session).is_ok());
    }

    #[test]
    fn test_invariant_set_holds_after_votes() {
        let session = SessionSetup::new(None, two_by_two()).start().expect("start");
        let request = VoteRequest::new(0, 0, CategoryScores::new(3, 3, 3, 3), true);
        match session.submit_vote(request).expect("vote") {
            (_, VoteOutcome::Active(session)) => {
                assert!(SessionInvariants::check_all(&session).is_ok());
            }
            (_, VoteOutcome::Complete(_)) => panic!("Expected active session"),
        }
    }

    #[test]
    fn test_invariant_set_detects_skipped_slot() {
        let mut session = SessionSetup::new(None, two_by_two()).start().expect("start");
        session.cursor = TurnCursor::from(crate::SlotRef::new(1, 0));

        let violations = SessionInvariants::check_all(&session).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].description,
            <ExactlyOnceInvariant as Invariant<SessionActive>>::description()
        );
    }

    #[test]
    fn test_two_invariants_as_set() {
        let session = SessionSetup::new(None, two_by_two()).start().expect("start");
        type TwoInvariants = (CursorInBoundsInvariant, BonusOnceInvariant);
        assert!(TwoInvariants::check_all(&session).is_ok());
    }
}
