//! Votes as first-class domain events.
//!
//! A [`VoteRequest`] is a participant's intent and can be checked against a
//! session before anything changes. A [`Vote`] is what the ledger keeps once
//! the request is accepted.

use crate::error::SessionError;
use crate::slot::SlotRef;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::instrument;

/// Lowest score a category accepts.
pub const MIN_CATEGORY_SCORE: i32 = 0;
/// Highest score a category accepts.
pub const MAX_CATEGORY_SCORE: i32 = 10;
/// Flat points added by the one-time bonus.
pub const BONUS_POINTS: i32 = 5;

/// One of the four judged aspects of a restaurant.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    /// The food (cibo).
    Food,
    /// The service (servizio).
    Service,
    /// The location.
    Location,
    /// The bill (conto).
    Bill,
}

/// The four category scores of one vote.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, derive_new::new,
)]
pub struct CategoryScores {
    /// Food score.
    #[serde(alias = "cibo")]
    pub food: i32,
    /// Service score.
    #[serde(alias = "servizio")]
    pub service: i32,
    /// Location score.
    pub location: i32,
    /// Bill score.
    #[serde(alias = "conto")]
    pub bill: i32,
}

impl CategoryScores {
    /// Score for a single category.
    pub fn get(&self, category: Category) -> i32 {
        match category {
            Category::Food => self.food,
            Category::Service => self.service,
            Category::Location => self.location,
            Category::Bill => self.bill,
        }
    }

    /// Sum of the four categories, without bonus.
    pub fn sum(&self) -> i32 {
        Category::iter().map(|c| self.get(c)).sum()
    }

    /// Checks every category lies within `0..=10`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ScoreOutOfRange`] for the first offending category.
    pub fn check_range(&self) -> Result<(), SessionError> {
        match Category::iter()
            .find(|c| !(MIN_CATEGORY_SCORE..=MAX_CATEGORY_SCORE).contains(&self.get(*c)))
        {
            Some(category) => Err(SessionError::ScoreOutOfRange {
                category,
                value: self.get(category),
            }),
            None => Ok(()),
        }
    }
}

impl Default for CategoryScores {
    /// The mid-scale starting point the sliders show.
    fn default() -> Self {
        Self::new(5, 5, 5, 5)
    }
}

/// A participant's request to fill a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VoteRequest {
    /// The slot being voted.
    pub slot: SlotRef,
    /// The four category scores.
    pub scores: CategoryScores,
    /// Whether the participant asks to spend their bonus.
    #[serde(default)]
    pub wants_bonus: bool,
}

impl VoteRequest {
    /// Creates a new vote request.
    #[instrument]
    pub fn new(
        round: usize,
        participant: usize,
        scores: CategoryScores,
        wants_bonus: bool,
    ) -> Self {
        Self {
            slot: SlotRef::new(round, participant),
            scores,
            wants_bonus,
        }
    }
}

/// A recorded vote. Immutable once in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Vote {
    slot: SlotRef,
    scores: CategoryScores,
    bonus_applied: bool,
    total: i32,
}

impl Vote {
    /// Builds a vote and computes its total.
    pub(crate) fn new(slot: SlotRef, scores: CategoryScores, bonus_applied: bool) -> Self {
        Self {
            slot,
            scores,
            bonus_applied,
            total: total_for(&scores, bonus_applied),
        }
    }

    /// The slot this vote fills.
    pub fn slot(&self) -> SlotRef {
        self.slot
    }

    /// The category scores.
    pub fn scores(&self) -> &CategoryScores {
        &self.scores
    }

    /// Whether the bonus was actually applied.
    pub fn bonus_applied(&self) -> bool {
        self.bonus_applied
    }

    /// Sum of scores plus the bonus, if applied.
    pub fn total(&self) -> i32 {
        self.total
    }

    /// Whether the stored total agrees with the scores and bonus flag.
    pub fn is_consistent(&self) -> bool {
        self.scores.check_range().is_ok()
            && self.total == total_for(&self.scores, self.bonus_applied)
    }
}

fn total_for(scores: &CategoryScores, bonus_applied: bool) -> i32 {
    scores.sum() + if bonus_applied { BONUS_POINTS } else { 0 }
}

impl std::fmt::Display for Vote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot {} -> {}", self.slot, self.total)?;
        if self.bonus_applied {
            write!(f, " (bonus)")?;
        }
        Ok(())
    }
}
