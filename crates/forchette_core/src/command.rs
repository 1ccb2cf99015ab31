//! Snapshot-in, snapshot-out command application.
//!
//! Storage layers read a [`SessionSnapshot`], call [`SessionSnapshot::apply`]
//! and write the returned snapshot back. Applying is pure, so a caller that
//! loses a write race simply reloads and applies the same command again.

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::session::{Session, SessionSnapshot};
use crate::typestate::ResetMode;
use crate::vote::{Vote, VoteRequest};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// A mutation of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, strum::IntoStaticStr)]
#[serde(tag = "command", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    /// Replace the draft config (setup only).
    Configure {
        /// The new draft.
        config: SessionConfig,
    },
    /// Validate and begin voting.
    Start,
    /// Vote for the current slot.
    SubmitVote {
        /// The vote.
        request: VoteRequest,
    },
    /// Return a complete session to setup.
    Reset {
        /// What to do with the config.
        #[serde(default)]
        mode: ResetMode,
    },
    /// Reveal one more ranking entry.
    RevealNext,
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// The result of applying a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// The session after the command.
    pub snapshot: SessionSnapshot,
    /// The vote recorded, for [`Command::SubmitVote`].
    pub vote: Option<Vote>,
}

impl SessionSnapshot {
    /// Applies a command to this snapshot, returning the new snapshot.
    ///
    /// The snapshot is validated first, so a corrupt snapshot is never
    /// mutated.
    ///
    /// # Errors
    ///
    /// Any [`SessionError`]; `self` is left unchanged.
    #[instrument(skip(self, command), fields(phase = %self.phase, command = command.name()))]
    pub fn apply(&self, command: Command) -> Result<Applied, SessionError> {
        let session = Session::try_from(self.clone())?;
        let (session, vote) = match command {
            Command::Configure { config } => (session.configure(config)?, None),
            Command::Start => (session.start()?, None),
            Command::SubmitVote { request } => {
                let (session, vote) = session.submit_vote(request)?;
                (session, Some(vote))
            }
            Command::Reset { mode } => (session.reset(mode)?, None),
            Command::RevealNext => (session.reveal_next()?, None),
        };
        Ok(Applied {
            snapshot: session.snapshot(),
            vote,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Phase;
    use crate::vote::CategoryScores;

    #[test]
    fn test_apply_leaves_input_untouched_on_error() {
        let snapshot = SessionSnapshot::default();
        let before = snapshot.clone();
        let request = VoteRequest::new(0, 0, CategoryScores::default(), false);
        assert!(snapshot.apply(Command::SubmitVote { request }).is_err());
        assert_eq!(snapshot, before);
    }

    #[test]
    fn test_apply_start_then_vote() {
        let started = SessionSnapshot::default().apply(Command::Start).expect("start");
        assert_eq!(started.snapshot.phase, Phase::Active);
        assert!(started.vote.is_none());

        let request = VoteRequest::new(0, 0, CategoryScores::new(1, 2, 3, 4), true);
        let voted = started
            .snapshot
            .apply(Command::SubmitVote { request })
            .expect("vote");
        assert_eq!(voted.vote.map(|v| v.total()), Some(15));
        assert_eq!(voted.snapshot.cursor.participant(), 1);
    }

    #[test]
    fn test_command_wire_form() {
        let json = serde_json::to_value(Command::Reset {
            mode: ResetMode::FreshDefaults,
        })
        .expect("serialize");
        assert_eq!(json, serde_json::json!({"command": "reset", "mode": "fresh-defaults"}));
        assert_eq!(Command::RevealNext.name(), "reveal_next");
    }
}
