//! Forchette core - the turn-state machine and score ledger of a
//! restaurant-rating dinner game.
//!
//! A session walks every (round, participant) slot once. Each participant
//! scores each restaurant on four categories, may spend a one-time bonus,
//! and once the last slot is filled the rounds are ranked by total score.
//!
//! # Architecture
//!
//! - **Config**: editable draft plus a validated form ([`SessionConfig`], [`ValidConfig`])
//! - **Cursor**: the advancing slot pointer and its walk modes ([`TurnCursor`])
//! - **Ledger**: one vote per slot, bonus bookkeeping ([`ScoreLedger`])
//! - **Phases**: typestate structs for setup, active and complete sessions
//! - **Snapshot**: the plain record storage layers persist ([`SessionSnapshot`])
//!
//! Nothing here performs I/O. Every operation takes a session or snapshot and
//! returns a new one.
//!
//! # Example
//!
//! ```
//! use forchette_core::{CategoryScores, Session, SessionConfig, VoteRequest};
//!
//! # fn example() -> Result<(), forchette_core::SessionError> {
//! let config = SessionConfig::new(
//!     vec!["Pizza Place".into(), "Sushi Bar".into()],
//!     vec!["Alice".into(), "Bob".into()],
//! );
//! let session = Session::create(None, config).start()?;
//! let request = VoteRequest::new(0, 0, CategoryScores::new(10, 10, 10, 10), true);
//! let (session, vote) = session.submit_vote(request)?;
//! assert_eq!(vote.total(), 45);
//! assert_eq!(session.current_slot().map(|s| s.participant), Some(1));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod command;
mod config;
mod contracts;
mod cursor;
mod error;
pub mod invariants;
mod ledger;
mod ranking;
mod session;
mod slot;
mod typestate;
mod vote;

pub use command::{Applied, Command};
pub use config::{
    ConfigError, CountField, MAX_PARTICIPANTS, MAX_ROUNDS, MIN_PARTICIPANTS, MIN_ROUNDS, NameList,
    SessionConfig, SessionMode, ValidConfig, default_participant_names, default_round_names,
};
pub use contracts::{
    Contract, LegalVote, ScoresInRange, SlotIsEmpty, SlotMatchesCursor, VoteContract,
};
pub use cursor::{Advance, TurnCursor};
pub use error::SessionError;
pub use ledger::ScoreLedger;
pub use ranking::{RankingEntry, compute_ranking, winner};
pub use session::{CurrentTurn, Phase, Session, SessionSnapshot};
pub use slot::{SlotKey, SlotParseError, SlotRef};
pub use typestate::{ResetMode, SessionActive, SessionComplete, SessionSetup, VoteOutcome};
pub use vote::{
    BONUS_POINTS, Category, CategoryScores, MAX_CATEGORY_SCORE, MIN_CATEGORY_SCORE, Vote,
    VoteRequest,
};
