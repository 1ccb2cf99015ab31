//! Slot addressing: one (round, participant) pair per required vote.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::str::FromStr;

/// A (round, participant) pair that requires exactly one vote.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    JsonSchema,
    derive_new::new,
)]
pub struct SlotRef {
    /// Zero-based round index.
    pub round: usize,
    /// Zero-based participant index.
    pub participant: usize,
}

impl SlotRef {
    /// Returns the flat storage key for this slot.
    pub fn key(self) -> SlotKey {
        SlotKey(self)
    }
}

impl std::fmt::Display for SlotRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.round, self.participant)
    }
}

/// Failure to parse a `"{round}:{participant}"` key.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("Invalid slot key: '{}'", _0)]
pub struct SlotParseError(pub String);

impl std::error::Error for SlotParseError {}

impl FromStr for SlotRef {
    type Err = SlotParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (round, participant) = s
            .split_once(':')
            .ok_or_else(|| SlotParseError(s.to_string()))?;
        let round = round.parse().map_err(|_| SlotParseError(s.to_string()))?;
        let participant = participant
            .parse()
            .map_err(|_| SlotParseError(s.to_string()))?;
        Ok(SlotRef { round, participant })
    }
}

/// Map key form of a [`SlotRef`].
///
/// Serializes as the string `"{round}:{participant}"` so vote maps stay flat
/// string-keyed objects in any document store. Ordering follows the slot,
/// round first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SlotKey(SlotRef);

impl SlotKey {
    /// The slot this key addresses.
    pub fn slot(self) -> SlotRef {
        self.0
    }
}

impl From<SlotRef> for SlotKey {
    fn from(slot: SlotRef) -> Self {
        SlotKey(slot)
    }
}

impl From<SlotKey> for String {
    fn from(key: SlotKey) -> Self {
        key.0.to_string()
    }
}

impl TryFrom<String> for SlotKey {
    type Error = SlotParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse().map(SlotKey)
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl JsonSchema for SlotKey {
    fn schema_name() -> Cow<'static, str> {
        "SlotKey".into()
    }

    fn json_schema(_generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        schemars::json_schema!({
            "type": "string",
            "pattern": "^[0-9]+:[0-9]+$"
        })
    }
}
