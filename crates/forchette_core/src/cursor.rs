//! The turn cursor: which slot must be voted next.

use crate::config::SessionMode;
use crate::slot::SlotRef;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

/// Result of advancing the cursor past a freshly filled slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The next slot awaiting a vote.
    Next(SlotRef),
    /// Every slot has been filled.
    Complete,
}

/// The advancing (round, participant) pointer.
///
/// The cursor never points out of bounds. Once the last slot is filled it
/// stays there and the session phase records completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct TurnCursor {
    round: usize,
    participant: usize,
}

impl TurnCursor {
    /// The cursor at the first slot, (0, 0).
    pub fn start() -> Self {
        Self::default()
    }

    /// Current round index.
    pub fn round(&self) -> usize {
        self.round
    }

    /// Current participant index.
    pub fn participant(&self) -> usize {
        self.participant
    }

    /// The slot this cursor points at.
    pub fn slot(&self) -> SlotRef {
        SlotRef::new(self.round, self.participant)
    }

    /// Whether the cursor lies inside a `round_count` x `participant_count` grid.
    pub fn in_bounds(&self, round_count: usize, participant_count: usize) -> bool {
        self.round < round_count && self.participant < participant_count
    }

    /// Computes the slot after the current one.
    ///
    /// Round-major walks participants first and wraps into the next round.
    /// One-shot walks participants of round 0 only. Empty grids complete
    /// immediately.
    #[instrument(level = "trace")]
    pub fn advance(
        self,
        mode: SessionMode,
        round_count: usize,
        participant_count: usize,
    ) -> Advance {
        if round_count == 0 || participant_count == 0 {
            return Advance::Complete;
        }

        let next = match mode {
            SessionMode::RoundMajor => {
                if self.participant + 1 < participant_count {
                    Some(SlotRef::new(self.round, self.participant + 1))
                } else if self.round + 1 < round_count {
                    Some(SlotRef::new(self.round + 1, 0))
                } else {
                    None
                }
            }
            SessionMode::OneShot => {
                let next = self.participant + 1;
                (next < participant_count).then(|| SlotRef::new(0, next))
            }
        };

        trace!(?next, "Cursor advanced");
        next.map_or(Advance::Complete, Advance::Next)
    }

    /// Zero-based position of the cursor in traversal order.
    ///
    /// This equals the number of slots filled before the cursor. Saturates
    /// for a cursor far outside any real grid.
    pub fn ordinal(&self, participant_count: usize) -> usize {
        self.round
            .saturating_mul(participant_count)
            .saturating_add(self.participant)
    }

    /// The last slot of a grid, where a completed session's cursor rests.
    pub fn last(round_count: usize, participant_count: usize) -> Self {
        Self {
            round: round_count.saturating_sub(1),
            participant: participant_count.saturating_sub(1),
        }
    }

    /// Every slot of the grid in the order the cursor visits them.
    pub fn traversal(
        mode: SessionMode,
        round_count: usize,
        participant_count: usize,
    ) -> impl Iterator<Item = SlotRef> {
        let first = (round_count > 0 && participant_count > 0).then(|| SlotRef::new(0, 0));
        std::iter::successors(first, move |slot| {
            match TurnCursor::from(*slot).advance(mode, round_count, participant_count) {
                Advance::Next(next) => Some(next),
                Advance::Complete => None,
            }
        })
    }
}

impl From<SlotRef> for TurnCursor {
    fn from(slot: SlotRef) -> Self {
        Self {
            round: slot.round,
            participant: slot.participant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_major_walks_participants_first() {
        let cursor = TurnCursor::start();
        assert_eq!(
            cursor.advance(SessionMode::RoundMajor, 2, 2),
            Advance::Next(SlotRef::new(0, 1))
        );

        let cursor = TurnCursor::from(SlotRef::new(0, 1));
        assert_eq!(
            cursor.advance(SessionMode::RoundMajor, 2, 2),
            Advance::Next(SlotRef::new(1, 0))
        );
    }

    #[test]
    fn test_round_major_completes_after_last_slot() {
        let cursor = TurnCursor::from(SlotRef::new(1, 1));
        assert_eq!(cursor.advance(SessionMode::RoundMajor, 2, 2), Advance::Complete);
    }

    #[test]
    fn test_one_shot_stays_on_round_zero() {
        let slots: Vec<_> = TurnCursor::traversal(SessionMode::OneShot, 1, 3).collect();
        assert_eq!(
            slots,
            vec![SlotRef::new(0, 0), SlotRef::new(0, 1), SlotRef::new(0, 2)]
        );
    }

    #[test]
    fn test_empty_grid_completes_immediately() {
        let cursor = TurnCursor::start();
        assert_eq!(cursor.advance(SessionMode::RoundMajor, 0, 4), Advance::Complete);
        assert_eq!(cursor.advance(SessionMode::OneShot, 1, 0), Advance::Complete);
        assert_eq!(TurnCursor::traversal(SessionMode::RoundMajor, 0, 0).count(), 0);
    }

    #[test]
    fn test_traversal_visits_every_slot_once() {
        let slots: Vec<_> = TurnCursor::traversal(SessionMode::RoundMajor, 3, 4).collect();
        assert_eq!(slots.len(), 12);
        for (ordinal, slot) in slots.iter().enumerate() {
            assert_eq!(TurnCursor::from(*slot).ordinal(4), ordinal);
        }
    }

    #[test]
    fn test_last_slot() {
        assert_eq!(TurnCursor::last(3, 4).slot(), SlotRef::new(2, 3));
    }
}
