//! Session configuration and its validation.
//!
//! A [`SessionConfig`] is the editable draft a host fills in during setup.
//! It may hold any values at all; only [`SessionConfig::validate`] turns it
//! into a [`ValidConfig`], which is the only form the voting phases accept.

use derive_getters::Getters;
use derive_setters::Setters;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Fewest participants a session may have.
pub const MIN_PARTICIPANTS: usize = 2;
/// Most participants a session may have.
pub const MAX_PARTICIPANTS: usize = 8;
/// Fewest rounds in round-major mode.
pub const MIN_ROUNDS: usize = 2;
/// Most rounds in round-major mode.
pub const MAX_ROUNDS: usize = 8;

const DEFAULT_ROUND_NAMES: [&str; MAX_ROUNDS] = [
    "La Bottega",
    "Trattoria Roma",
    "Osteria Bella",
    "Spadella d'Oro",
    "La Brace",
    "Il Tegame",
    "Forchetta & Co",
    "Sugo Supremo",
];

const DEFAULT_COUNT: usize = 4;

/// How the turn cursor walks the (round, participant) grid.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SessionMode {
    /// Every participant rates every round, participant index first.
    #[default]
    RoundMajor,
    /// A single round rated once by each participant.
    OneShot,
}

impl SessionMode {
    /// Inclusive bounds on the round count for this mode.
    pub fn round_bounds(self) -> (usize, usize) {
        match self {
            SessionMode::RoundMajor => (MIN_ROUNDS, MAX_ROUNDS),
            SessionMode::OneShot => (1, 1),
        }
    }
}

/// Which list of names a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum NameList {
    /// `round_names`.
    Round,
    /// `participant_names`.
    Participant,
}

/// Which count a bounds failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CountField {
    /// `round_count`.
    RoundCount,
    /// `participant_count`.
    ParticipantCount,
}

/// Reason a [`SessionConfig`] cannot leave setup.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ConfigError {
    /// A required name is missing or blank after trimming.
    #[display("{} name at index {} is blank", list, index)]
    EmptyName {
        /// The list holding the blank name.
        list: NameList,
        /// Zero-based position of the blank name.
        index: usize,
    },

    /// A count lies outside the range allowed by the selected mode.
    #[display("{} must be within {}..={} (got {})", field, min, max, value)]
    OutOfBounds {
        /// The offending count.
        field: CountField,
        /// The value supplied.
        value: usize,
        /// Smallest allowed value.
        min: usize,
        /// Largest allowed value.
        max: usize,
    },
}

impl std::error::Error for ConfigError {}

impl ConfigError {
    /// Stable machine-readable tag for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigError::EmptyName { .. } => "empty_name",
            ConfigError::OutOfBounds { .. } => "out_of_bounds",
        }
    }
}

/// Draft game parameters, editable while the session is in setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct SessionConfig {
    /// Cursor walk mode.
    #[serde(default)]
    mode: SessionMode,
    /// Number of rounds (restaurants) to rate.
    round_count: usize,
    /// Number of participants voting.
    participant_count: usize,
    /// Round names; only the first `round_count` are required.
    #[serde(default)]
    round_names: Vec<String>,
    /// Participant names; only the first `participant_count` are required.
    #[serde(default)]
    participant_names: Vec<String>,
    /// Whether each participant may apply the one-time bonus.
    #[serde(default = "default_bonus_enabled")]
    bonus_enabled: bool,
}

fn default_bonus_enabled() -> bool {
    true
}

/// The stock restaurant names offered to a new session.
pub fn default_round_names() -> Vec<String> {
    DEFAULT_ROUND_NAMES.iter().map(|s| s.to_string()).collect()
}

/// The stock participant names offered to a new session.
pub fn default_participant_names() -> Vec<String> {
    (1..=MAX_PARTICIPANTS)
        .map(|n| format!("Giocatore {}", n))
        .collect()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: SessionMode::RoundMajor,
            round_count: DEFAULT_COUNT,
            participant_count: DEFAULT_COUNT,
            round_names: default_round_names(),
            participant_names: default_participant_names(),
            bonus_enabled: true,
        }
    }
}

impl SessionConfig {
    /// Creates a round-major config whose counts match the given name lists.
    #[instrument(
        skip_all,
        fields(rounds = round_names.len(), participants = participant_names.len())
    )]
    pub fn new(round_names: Vec<String>, participant_names: Vec<String>) -> Self {
        Self {
            mode: SessionMode::RoundMajor,
            round_count: round_names.len(),
            participant_count: participant_names.len(),
            round_names,
            participant_names,
            bonus_enabled: true,
        }
    }

    /// Creates a one-shot config: a single round rated once by everyone.
    #[instrument(skip_all, fields(participants = participant_names.len()))]
    pub fn one_shot(round_name: String, participant_names: Vec<String>) -> Self {
        Self {
            mode: SessionMode::OneShot,
            round_count: 1,
            participant_count: participant_names.len(),
            round_names: vec![round_name],
            participant_names,
            bonus_enabled: true,
        }
    }

    /// Validates the draft.
    ///
    /// Counts are checked before names, so a draft with both problems
    /// reports [`ConfigError::OutOfBounds`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfBounds`] when a count is outside its mode's
    /// range and [`ConfigError::EmptyName`] when a required name is blank.
    #[instrument(
        skip(self),
        fields(
            mode = %self.mode,
            rounds = self.round_count,
            participants = self.participant_count
        )
    )]
    pub fn validate(&self) -> Result<ValidConfig, ConfigError> {
        let (min_rounds, max_rounds) = self.mode.round_bounds();
        check_bounds(CountField::RoundCount, self.round_count, min_rounds, max_rounds)?;
        check_bounds(
            CountField::ParticipantCount,
            self.participant_count,
            MIN_PARTICIPANTS,
            MAX_PARTICIPANTS,
        )?;

        let round_names = required_names(NameList::Round, &self.round_names, self.round_count)?;
        let participant_names = required_names(
            NameList::Participant,
            &self.participant_names,
            self.participant_count,
        )?;

        debug!("Config validated");
        Ok(ValidConfig {
            mode: self.mode,
            round_names,
            participant_names,
            bonus_enabled: self.bonus_enabled,
        })
    }
}

fn check_bounds(
    field: CountField,
    value: usize,
    min: usize,
    max: usize,
) -> Result<(), ConfigError> {
    if value < min || value > max {
        warn!(%field, value, min, max, "Count out of bounds");
        return Err(ConfigError::OutOfBounds {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn required_names(
    list: NameList,
    names: &[String],
    count: usize,
) -> Result<Vec<String>, ConfigError> {
    (0..count)
        .map(|index| {
            let name = names.get(index).map(|n| n.trim()).unwrap_or_default();
            if name.is_empty() {
                warn!(%list, index, "Blank name");
                Err(ConfigError::EmptyName { list, index })
            } else {
                Ok(name.to_string())
            }
        })
        .collect()
}

/// A configuration that passed validation.
///
/// Names are trimmed and truncated to the active counts, so
/// `round_names().len()` is the round count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidConfig {
    mode: SessionMode,
    round_names: Vec<String>,
    participant_names: Vec<String>,
    bonus_enabled: bool,
}

impl ValidConfig {
    /// Cursor walk mode.
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Number of rounds.
    pub fn round_count(&self) -> usize {
        self.round_names.len()
    }

    /// Number of participants.
    pub fn participant_count(&self) -> usize {
        self.participant_names.len()
    }

    /// Trimmed round names, one per round.
    pub fn round_names(&self) -> &[String] {
        &self.round_names
    }

    /// Trimmed participant names, one per participant.
    pub fn participant_names(&self) -> &[String] {
        &self.participant_names
    }

    /// Whether the one-time bonus is available.
    pub fn bonus_enabled(&self) -> bool {
        self.bonus_enabled
    }

    /// Total number of slots that must be filled.
    pub fn slot_count(&self) -> usize {
        self.round_count() * self.participant_count()
    }
}

impl From<&ValidConfig> for SessionConfig {
    fn from(valid: &ValidConfig) -> Self {
        Self {
            mode: valid.mode,
            round_count: valid.round_count(),
            participant_count: valid.participant_count(),
            round_names: valid.round_names.clone(),
            participant_names: valid.participant_names.clone(),
            bonus_enabled: valid.bonus_enabled,
        }
    }
}
