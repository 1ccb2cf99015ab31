//! Final ranking of rounds by accumulated score.

use crate::config::ValidConfig;
use crate::ledger::ScoreLedger;
use derive_getters::Getters;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

/// One round's place in the ranking.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Getters, derive_new::new,
)]
pub struct RankingEntry {
    /// Round (restaurant) name.
    name: String,
    /// Sum of vote totals for the round.
    score: i32,
}

/// Ranks the rounds of `config` by the votes in `ledger`.
///
/// Rounds nobody voted score zero. The sort is stable, so rounds with equal
/// scores keep their configured order.
#[instrument(skip_all, fields(rounds = config.round_count(), votes = ledger.len()))]
pub fn compute_ranking(config: &ValidConfig, ledger: &ScoreLedger) -> Vec<RankingEntry> {
    let mut totals = vec![0; config.round_count()];
    for vote in ledger.votes() {
        match totals.get_mut(vote.slot().round) {
            Some(total) => *total += vote.total(),
            None => warn!(slot = %vote.slot(), "Vote outside configured rounds ignored"),
        }
    }

    let mut ranking: Vec<RankingEntry> = config
        .round_names()
        .iter()
        .zip(totals)
        .map(|(name, score)| RankingEntry::new(name.clone(), score))
        .collect();
    ranking.sort_by(|a, b| b.score.cmp(&a.score));
    ranking
}

/// Name of the top-ranked round.
pub fn winner(ranking: &[RankingEntry]) -> Option<&str> {
    ranking.first().map(|entry| entry.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::slot::SlotRef;
    use crate::vote::{CategoryScores, Vote};

    fn config(rounds: &[&str]) -> ValidConfig {
        SessionConfig::new(
            rounds.iter().map(|s| s.to_string()).collect(),
            vec!["Alice".into(), "Bob".into()],
        )
        .validate()
        .expect("valid config")
    }

    fn record(ledger: &mut ScoreLedger, round: usize, participant: usize, each: i32) {
        ledger
            .record(Vote::new(
                SlotRef::new(round, participant),
                CategoryScores::new(each, each, each, each),
                false,
            ))
            .expect("record");
    }

    #[test]
    fn test_empty_ledger_ranks_in_round_order() {
        let config = config(&["A", "B", "C"]);
        let ranking = compute_ranking(&config, &ScoreLedger::new());
        let names: Vec<_> = ranking.iter().map(|e| e.name().as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert!(ranking.iter().all(|e| *e.score() == 0));
    }

    #[test]
    fn test_sorted_descending() {
        let config = config(&["A", "B", "C"]);
        let mut ledger = ScoreLedger::new();
        record(&mut ledger, 0, 0, 1);
        record(&mut ledger, 1, 0, 5);
        record(&mut ledger, 2, 0, 3);
        let ranking = compute_ranking(&config, &ledger);
        assert_eq!(
            ranking,
            vec![
                RankingEntry::new("B".into(), 20),
                RankingEntry::new("C".into(), 12),
                RankingEntry::new("A".into(), 4),
            ]
        );
        assert_eq!(winner(&ranking), Some("B"));
    }

    #[test]
    fn test_ties_keep_round_order() {
        let config = config(&["A", "B", "C", "D"]);
        let mut ledger = ScoreLedger::new();
        record(&mut ledger, 3, 0, 2);
        record(&mut ledger, 1, 0, 2);
        record(&mut ledger, 2, 1, 5);
        let ranking = compute_ranking(&config, &ledger);
        let names: Vec<_> = ranking.iter().map(|e| e.name().as_str()).collect();
        assert_eq!(names, vec!["C", "B", "D", "A"]);
    }

    #[test]
    fn test_winner_of_empty_ranking() {
        assert_eq!(winner(&[]), None);
    }
}
