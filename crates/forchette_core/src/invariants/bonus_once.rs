//! Bonus invariant: each participant applies the bonus at most once.

use super::{Invariant, SessionView};
use std::collections::BTreeSet;

/// Invariant: at most one applied bonus per participant, none when the
/// bonus is disabled, and the ledger's bonus register matches the votes.
pub struct BonusOnceInvariant;

impl<S: SessionView> Invariant<S> for BonusOnceInvariant {
    fn holds(session: &S) -> bool {
        let ledger = session.ledger();
        let mut seen = BTreeSet::new();

        for vote in ledger.votes().filter(|v| v.bonus_applied()) {
            if !seen.insert(vote.slot().participant) {
                return false;
            }
        }

        if !session.config().bonus_enabled() && !seen.is_empty() {
            return false;
        }

        &seen == ledger.bonus_users()
    }

    fn description() -> &'static str {
        "Each participant applies the bonus at most once"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CategoryScores, SessionConfig, SessionSetup, VoteOutcome, VoteRequest};

    #[test]
    fn test_holds_through_bonus_votes() {
        let mut session = SessionSetup::new(None, SessionConfig::default())
            .start()
            .expect("start");
        for participant in 0..4 {
            let request = VoteRequest::new(0, participant, CategoryScores::default(), true);
            session = match session.submit_vote(request).expect("vote") {
                (vote, VoteOutcome::Active(next)) => {
                    assert!(vote.bonus_applied());
                    next
                }
                (_, VoteOutcome::Complete(_)) => panic!("Expected active session"),
            };
            assert!(BonusOnceInvariant::holds(&session));
        }
        assert_eq!(session.ledger.bonus_users().len(), 4);
    }
}
