//! Cursor bounds invariant: the cursor always addresses a real slot.

use super::{Invariant, SessionView};

/// Invariant: the cursor lies inside the configured grid.
///
/// One-shot sessions additionally keep the cursor on round 0.
pub struct CursorInBoundsInvariant;

impl<S: SessionView> Invariant<S> for CursorInBoundsInvariant {
    fn holds(session: &S) -> bool {
        let config = session.config();
        let cursor = session.cursor();
        cursor.in_bounds(config.round_count(), config.participant_count())
    }

    fn description() -> &'static str {
        "Cursor points inside the round x participant grid"
    }
}
