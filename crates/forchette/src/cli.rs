//! Command-line interface for forchette.

use clap::{Args, Parser, Subcommand};
use forchette_core::{CategoryScores, SessionConfig, SessionMode, VoteRequest};
use std::path::PathBuf;

/// Forchette - restaurant-rating dinner game
#[derive(Parser, Debug)]
#[command(name = "forchette")]
#[command(about = "Run and score restaurant-rating dinner sessions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Settings file
    #[arg(long, global = true, default_value = "forchette.toml")]
    pub config: PathBuf,

    /// Database file (overrides settings and FORCHETTE_DB_PATH)
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a session in setup
    Create {
        /// Session id
        session: String,

        /// Owner of the session
        #[arg(long)]
        owner: Option<String>,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Replace the draft config of a session in setup
    Configure {
        /// Session id
        session: String,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Validate the config and begin voting
    Start {
        /// Session id
        session: String,
    },

    /// Vote for the current slot
    Vote {
        /// Session id
        session: String,

        /// Round index
        #[arg(long)]
        round: usize,

        /// Participant index
        #[arg(long)]
        participant: usize,

        /// Food score (0-10)
        #[arg(long)]
        food: i32,

        /// Service score (0-10)
        #[arg(long)]
        service: i32,

        /// Location score (0-10)
        #[arg(long)]
        location: i32,

        /// Bill score (0-10)
        #[arg(long)]
        bill: i32,

        /// Spend this participant's bonus
        #[arg(long)]
        bonus: bool,
    },

    /// Print the session snapshot
    Status {
        /// Session id
        session: String,
    },

    /// Print the ranking (provisional while voting)
    Ranking {
        /// Session id
        session: String,
    },

    /// Print the slot awaiting a vote and who casts it
    Slot {
        /// Session id
        session: String,
    },

    /// Reveal one more ranking entry
    Reveal {
        /// Session id
        session: String,
    },

    /// Return a finished session to setup
    Reset {
        /// Session id
        session: String,

        /// Start over from the stock defaults instead of keeping the config
        #[arg(long)]
        fresh: bool,
    },

    /// List stored session ids
    List,

    /// Run the HTTP server
    Serve {
        /// Host to bind to (overrides settings)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides settings)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the JSON schema of a session snapshot
    Schema,
}

/// Config edits shared by `create` and `configure`.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Walk mode (round-major or one-shot)
    #[arg(long)]
    pub mode: Option<SessionMode>,

    /// Round names, comma separated
    #[arg(long = "rounds", value_delimiter = ',')]
    pub rounds: Vec<String>,

    /// Participant names, comma separated
    #[arg(long = "participants", value_delimiter = ',')]
    pub participants: Vec<String>,

    /// Disable the one-time bonus
    #[arg(long)]
    pub no_bonus: bool,
}

impl ConfigArgs {
    /// Applies these edits on top of `draft`.
    pub fn apply_to(self, mut draft: SessionConfig) -> SessionConfig {
        if let Some(mode) = self.mode {
            draft = draft.with_mode(mode);
            if mode == SessionMode::OneShot && self.rounds.is_empty() {
                draft = draft.with_round_count(1);
            }
        }
        if !self.rounds.is_empty() {
            draft = draft
                .with_round_count(self.rounds.len())
                .with_round_names(self.rounds);
        }
        if !self.participants.is_empty() {
            draft = draft
                .with_participant_count(self.participants.len())
                .with_participant_names(self.participants);
        }
        if self.no_bonus {
            draft = draft.with_bonus_enabled(false);
        }
        draft
    }
}

/// Builds the vote request for a `vote` command.
pub fn vote_request(
    round: usize,
    participant: usize,
    food: i32,
    service: i32,
    location: i32,
    bill: i32,
    bonus: bool,
) -> VoteRequest {
    VoteRequest::new(
        round,
        participant,
        CategoryScores::new(food, service, location, bill),
        bonus,
    )
}
