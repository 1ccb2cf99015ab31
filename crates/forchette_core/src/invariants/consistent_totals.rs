//! Totals invariant: stored totals agree with their scores.

use super::{Invariant, SessionView};

/// Invariant: every vote's scores are in range and its total equals the
/// category sum plus the bonus when applied.
pub struct ConsistentTotalsInvariant;

impl<S: SessionView> Invariant<S> for ConsistentTotalsInvariant {
    fn holds(session: &S) -> bool {
        session.ledger().votes().all(|vote| vote.is_consistent())
    }

    fn description() -> &'static str {
        "Vote totals equal category sum plus bonus"
    }
}
