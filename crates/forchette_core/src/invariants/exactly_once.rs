//! Exactly-once invariant: the filled slots are precisely the slots the
//! cursor has already passed, one vote each.

use super::{Invariant, SessionView};
use crate::cursor::TurnCursor;

/// Invariant: every slot before the cursor holds exactly one vote and no
/// slot at or after it holds any.
///
/// Each vote is also stored under its own slot's key.
pub struct ExactlyOnceInvariant;

impl<S: SessionView> Invariant<S> for ExactlyOnceInvariant {
    fn holds(session: &S) -> bool {
        let config = session.config();
        let (rounds, participants) = (config.round_count(), config.participant_count());
        if !session.cursor().in_bounds(rounds, participants) {
            return false;
        }

        let ledger = session.ledger();
        let filled = session.filled_slots();

        if ledger.len() != filled {
            return false;
        }

        ledger.votes_by_slot().iter().all(|(key, vote)| {
            let slot = vote.slot();
            let cursor = TurnCursor::from(slot);
            key.slot() == slot
                && cursor.in_bounds(rounds, participants)
                && cursor.ordinal(participants) < filled
        })
    }

    fn description() -> &'static str {
        "Each slot before the cursor holds exactly one vote"
    }
}
