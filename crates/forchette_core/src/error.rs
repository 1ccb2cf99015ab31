//! Errors raised by session operations.
//!
//! Every error leaves the session untouched; callers refresh their snapshot,
//! fix the input and retry.

use crate::config::ConfigError;
use crate::session::Phase;
use crate::slot::SlotRef;
use crate::vote::Category;

/// Error that can occur when applying an operation to a session.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum SessionError {
    /// The configuration failed validation.
    #[display("Invalid configuration: {}", _0)]
    Config(ConfigError),

    /// The operation is not allowed in the current phase.
    #[display("Operation requires a {} session, but it is {}", expected, actual)]
    InvalidPhase {
        /// Phase the operation needs.
        expected: Phase,
        /// Phase the session is in.
        actual: Phase,
    },

    /// The vote targets a slot other than the cursor's.
    #[display("Vote targets slot {} but the current slot is {}", got, expected)]
    SlotMismatch {
        /// The cursor's slot.
        expected: SlotRef,
        /// The slot the vote named.
        got: SlotRef,
    },

    /// A category score lies outside `0..=10`.
    #[display("{} score {} is outside 0..=10", category, value)]
    ScoreOutOfRange {
        /// The offending category.
        category: Category,
        /// The value supplied.
        value: i32,
    },

    /// The slot already holds a vote.
    #[display("Slot {} already has a recorded vote", _0)]
    DuplicateSlot(SlotRef),

    /// A postcondition failed after applying an operation.
    #[display("Invariant violation: {}", _0)]
    InvariantViolation(String),

    /// A persisted snapshot does not describe a reachable session.
    #[display("Corrupt snapshot: {}", _0)]
    CorruptSnapshot(String),
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(err: ConfigError) -> Self {
        SessionError::Config(err)
    }
}

impl SessionError {
    /// Stable machine-readable tag for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Config(err) => err.kind(),
            SessionError::InvalidPhase { .. } => "invalid_phase",
            SessionError::SlotMismatch { .. } => "slot_mismatch",
            SessionError::ScoreOutOfRange { .. } => "score_out_of_range",
            SessionError::DuplicateSlot(_) => "duplicate_slot",
            SessionError::InvariantViolation(_) => "invariant_violation",
            SessionError::CorruptSnapshot(_) => "corrupt_snapshot",
        }
    }

    /// Whether another writer got there first; refresh and move on.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            SessionError::SlotMismatch { .. } | SessionError::DuplicateSlot(_)
        )
    }
}
