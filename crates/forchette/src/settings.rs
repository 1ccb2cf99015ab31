//! Application settings loaded from `forchette.toml` and the environment.

use derive_getters::Getters;
use derive_more::{Display, Error};
use forchette_core::{SessionConfig, SessionMode, default_participant_names, default_round_names};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Environment variable overriding the database path.
pub const ENV_DB_PATH: &str = "FORCHETTE_DB_PATH";
/// Environment variable overriding the bind host.
pub const ENV_HOST: &str = "FORCHETTE_HOST";
/// Environment variable overriding the bind port.
pub const ENV_PORT: &str = "FORCHETTE_PORT";

/// Runtime settings for the store, the HTTP server and new sessions.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct Settings {
    /// SQLite database file.
    #[serde(default = "default_db_path")]
    db_path: String,

    /// Host the HTTP server binds to.
    #[serde(default = "default_host")]
    host: String,

    /// Port the HTTP server binds to.
    #[serde(default = "default_port")]
    port: u16,

    /// Walk mode offered to newly created sessions.
    #[serde(default)]
    default_mode: SessionMode,

    /// Whether new sessions start with the bonus enabled.
    #[serde(default = "default_bonus_enabled")]
    bonus_enabled: bool,

    /// How many times a contended write is re-applied before giving up.
    #[serde(default = "default_conflict_retries")]
    conflict_retries: u32,
}

#[instrument]
fn default_db_path() -> String {
    "forchette.db".to_string()
}

#[instrument]
fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[instrument]
fn default_port() -> u16 {
    3000
}

#[instrument]
fn default_bonus_enabled() -> bool {
    true
}

#[instrument]
fn default_conflict_retries() -> u32 {
    3
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            host: default_host(),
            port: default_port(),
            default_mode: SessionMode::default(),
            bonus_enabled: default_bonus_enabled(),
            conflict_retries: default_conflict_retries(),
        }
    }
}

impl Settings {
    /// Parses settings from TOML text. Missing keys take their defaults.
    #[instrument(skip(content))]
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        toml::from_str(content)
            .map_err(|e| SettingsError::new(format!("Failed to parse settings: {}", e)))
    }

    /// Loads settings from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        debug!("Loading settings from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SettingsError::new(format!("Failed to read settings file: {}", e)))?;
        let settings = Self::from_toml(&content)?;
        info!(db_path = %settings.db_path, "Settings loaded");
        Ok(settings)
    }

    /// Loads settings for a run: the file if it exists, defaults otherwise,
    /// then `FORCHETTE_*` environment overrides.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let settings = if path.as_ref().exists() {
            Self::from_file(path)?
        } else {
            debug!("No settings file, using defaults");
            Self::default()
        };
        settings.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from a variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the port override is not a valid port.
    #[instrument(skip(self, lookup))]
    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        if let Some(db_path) = lookup(ENV_DB_PATH) {
            debug!(%db_path, "Database path overridden");
            self.db_path = db_path;
        }
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port
                .parse()
                .map_err(|_| {
                    SettingsError::new(format!("{} is not a port: '{}'", ENV_PORT, port))
                })?;
        }
        Ok(self)
    }

    /// Replaces the database path when one is given.
    pub fn override_db_path(mut self, db_path: Option<String>) -> Self {
        if let Some(db_path) = db_path {
            self.db_path = db_path;
        }
        self
    }

    /// Replaces the bind address parts that are given.
    pub fn override_bind(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    /// The draft config a new session starts from.
    #[instrument(skip(self))]
    pub fn draft_config(&self) -> SessionConfig {
        let draft = match self.default_mode {
            SessionMode::RoundMajor => SessionConfig::default(),
            SessionMode::OneShot => {
                let round = default_round_names().into_iter().next().unwrap_or_default();
                let participants = *SessionConfig::default().participant_count();
                SessionConfig::one_shot(
                    round,
                    default_participant_names().into_iter().take(participants).collect(),
                )
            }
        };
        draft.with_bonus_enabled(self.bonus_enabled)
    }
}

/// Settings error.
#[derive(Debug, Clone, Display, Error)]
#[display("Settings error: {} at {}:{}", message, file, line)]
pub struct SettingsError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl SettingsError {
    /// Creates a new settings error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
