//! Win/loss summary over a set of normalized records
//!
//! Shared by the meta report and the single-player pipeline.

use serde::{Deserialize, Serialize};
use shared::{normalize_category, MatchRecord, Outcome};
use std::collections::BTreeMap;

/// Games and wins against (or with) one deck category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub games: u64,
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
}

impl CategoryStats {
    fn record(&mut self, outcome: Outcome) {
        self.games += 1;
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Draw => self.draws += 1,
        }
    }

    /// Share of games won, 0.0 when no games were played
    pub fn win_rate(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.wins as f64 / self.games as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    pub overall: CategoryStats,
    /// Keyed by the opponent's normalized deck category
    pub opponent_categories: BTreeMap<String, CategoryStats>,
    /// Keyed by the local player's normalized deck category
    pub player_categories: BTreeMap<String, CategoryStats>,
}

impl CohortSummary {
    pub fn from_records(records: &[MatchRecord]) -> Self {
        let mut summary = Self::default();
        for record in records {
            summary.overall.record(record.outcome);
            summary
                .opponent_categories
                .entry(normalize_category(&record.opponent_category))
                .or_default()
                .record(record.outcome);
            summary
                .player_categories
                .entry(normalize_category(&record.category))
                .or_default()
                .record(record.outcome);
        }
        summary
    }

    pub fn games_played(&self) -> u64 {
        self.overall.games
    }

    /// Opponent categories sorted by descending games, then name
    pub fn opponent_by_frequency(&self) -> Vec<(&str, &CategoryStats)> {
        let mut rows: Vec<(&str, &CategoryStats)> = self
            .opponent_categories
            .iter()
            .map(|(name, stats)| (name.as_str(), stats))
            .collect();
        rows.sort_by(|a, b| b.1.games.cmp(&a.1.games).then_with(|| a.0.cmp(b.0)));
        rows
    }
}
