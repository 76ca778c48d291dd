//! Per-category record counting
//!
//! Counts are keyed by the opponent's deck category, normalized so that case
//! and whitespace variants share a bucket.

use shared::{normalize_category, MatchRecord};
use std::collections::BTreeMap;

/// Category name (normalized) to record count
pub type CategoryCounts = BTreeMap<String, u64>;

/// Incremental reducer over an append-only cohort
///
/// Folding only the unseen tail of the cohort is equivalent to recounting the
/// whole cohort because the cohort never shrinks or reorders.
#[derive(Debug, Clone, Default)]
pub struct RecordAggregator {
    counts: CategoryCounts,
    total: u64,
    folded: usize,
}

impl RecordAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a batch of new records
    pub fn fold(&mut self, delta: &[MatchRecord]) -> (&CategoryCounts, u64) {
        for record in delta {
            *self
                .counts
                .entry(normalize_category(&record.opponent_category))
                .or_insert(0) += 1;
        }
        self.total += delta.len() as u64;
        self.folded += delta.len();
        (&self.counts, self.total)
    }

    /// Bring the counts up to date with the full cohort
    ///
    /// Records already folded are skipped. A cohort shorter than what was
    /// already folded means the caller broke the append-only contract, so the
    /// counts are rebuilt from scratch instead.
    pub fn fold_cohort(&mut self, cohort: &[MatchRecord]) -> (&CategoryCounts, u64) {
        if cohort.len() < self.folded {
            *self = Self::recompute(cohort);
            return (&self.counts, self.total);
        }
        let start = self.folded;
        self.fold(&cohort[start..])
    }

    /// Count a cohort from scratch
    pub fn recompute(cohort: &[MatchRecord]) -> Self {
        let mut aggregator = Self::new();
        aggregator.fold(cohort);
        aggregator
    }

    pub fn counts(&self) -> &CategoryCounts {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn count_for(&self, category: &str) -> u64 {
        self.counts
            .get(&normalize_category(category))
            .copied()
            .unwrap_or(0)
    }
}
