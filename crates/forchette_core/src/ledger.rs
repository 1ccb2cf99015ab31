//! The score ledger: one vote per slot and per-participant bonus usage.

use crate::error::SessionError;
use crate::slot::{SlotKey, SlotRef};
use crate::vote::Vote;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument, warn};

/// Append-only record of the votes of one session.
///
/// Votes are keyed by slot, so a slot can never hold two. Participants who
/// applied their bonus are remembered for the rest of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreLedger {
    votes: BTreeMap<SlotKey, Vote>,
    bonus_used: BTreeSet<usize>,
}

impl ScoreLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from persisted parts without re-checking them.
    pub(crate) fn from_parts(votes: BTreeMap<SlotKey, Vote>, bonus_used: BTreeSet<usize>) -> Self {
        Self { votes, bonus_used }
    }

    /// Records a vote.
    ///
    /// Marks the participant's bonus as spent when the vote applied it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::DuplicateSlot`] if the slot already holds a vote
    /// and [`SessionError::InvariantViolation`] if the vote applies a bonus the
    /// participant already spent.
    #[instrument(skip(self), fields(slot = %vote.slot(), total = vote.total()))]
    pub(crate) fn record(&mut self, vote: Vote) -> Result<(), SessionError> {
        let slot = vote.slot();
        if self.votes.contains_key(&slot.key()) {
            warn!("Slot already filled");
            return Err(SessionError::DuplicateSlot(slot));
        }
        if vote.bonus_applied() && !self.bonus_used.insert(slot.participant) {
            return Err(SessionError::InvariantViolation(format!(
                "participant {} applied the bonus twice",
                slot.participant
            )));
        }
        self.votes.insert(slot.key(), vote);
        debug!(filled = self.votes.len(), "Vote recorded");
        Ok(())
    }

    /// The vote filling a slot, if any.
    pub fn vote(&self, slot: SlotRef) -> Option<&Vote> {
        self.votes.get(&slot.key())
    }

    /// Whether a slot already holds a vote.
    pub fn contains(&self, slot: SlotRef) -> bool {
        self.votes.contains_key(&slot.key())
    }

    /// All votes in slot order.
    pub fn votes(&self) -> impl Iterator<Item = &Vote> {
        self.votes.values()
    }

    /// The flat slot-keyed vote map.
    pub fn votes_by_slot(&self) -> &BTreeMap<SlotKey, Vote> {
        &self.votes
    }

    /// Number of recorded votes.
    pub fn len(&self) -> usize {
        self.votes.len()
    }

    /// Whether no vote has been recorded.
    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Whether a participant has already spent the bonus.
    pub fn bonus_used(&self, participant: usize) -> bool {
        self.bonus_used.contains(&participant)
    }

    /// Participants that have spent the bonus.
    pub fn bonus_users(&self) -> &BTreeSet<usize> {
        &self.bonus_used
    }

    /// Whether a bonus request from `participant` would be honored.
    pub fn bonus_available(&self, bonus_enabled: bool, participant: usize) -> bool {
        bonus_enabled && !self.bonus_used(participant)
    }

    /// Sum of vote totals for one round; zero when nobody voted it.
    pub fn round_total(&self, round: usize) -> i32 {
        self.votes
            .values()
            .filter(|v| v.slot().round == round)
            .map(Vote::total)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vote::CategoryScores;

    fn vote(round: usize, participant: usize, bonus: bool) -> Vote {
        Vote::new(SlotRef::new(round, participant), CategoryScores::new(1, 1, 1, 1), bonus)
    }

    #[test]
    fn test_record_and_lookup() {
        let mut ledger = ScoreLedger::new();
        ledger.record(vote(0, 1, false)).expect("record");
        assert!(ledger.contains(SlotRef::new(0, 1)));
        assert_eq!(ledger.vote(SlotRef::new(0, 1)).map(Vote::total), Some(4));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_duplicate_slot_rejected_without_overwrite() {
        let mut ledger = ScoreLedger::new();
        ledger.record(vote(0, 0, false)).expect("record");
        let second = Vote::new(SlotRef::new(0, 0), CategoryScores::new(9, 9, 9, 9), false);
        assert_eq!(
            ledger.record(second),
            Err(SessionError::DuplicateSlot(SlotRef::new(0, 0)))
        );
        assert_eq!(ledger.vote(SlotRef::new(0, 0)).map(Vote::total), Some(4));
    }

    #[test]
    fn test_bonus_marked_once() {
        let mut ledger = ScoreLedger::new();
        assert!(ledger.bonus_available(true, 0));
        ledger.record(vote(0, 0, true)).expect("record");
        assert!(ledger.bonus_used(0));
        assert!(!ledger.bonus_available(true, 0));
        assert!(ledger.bonus_available(true, 1));
        assert!(!ledger.bonus_available(false, 1));

        assert!(matches!(
            ledger.record(vote(1, 0, true)),
            Err(SessionError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_round_total_of_unvoted_round_is_zero() {
        let mut ledger = ScoreLedger::new();
        ledger.record(vote(0, 0, false)).expect("record");
        ledger.record(vote(0, 1, true)).expect("record");
        assert_eq!(ledger.round_total(0), 13);
        assert_eq!(ledger.round_total(1), 0);
    }
}
