//! Stopping rule for the sampling loop
//!
//! Combines a global record threshold with per-category thresholds for a
//! fixed set of mandatory categories. Categories outside that set are tracked
//! but never hold the run back.

use serde::{Deserialize, Serialize};
use shared::{normalize_category, Decision};
use std::collections::{BTreeMap, BTreeSet};

use super::aggregator::CategoryCounts;

/// Outcome of a single evaluation with the diagnostics behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub decision: Decision,
    pub enough_total: bool,
    pub enough_per_type: bool,
    /// Mandatory categories below threshold, with their current counts
    pub insufficient: BTreeMap<String, u64>,
}

impl Evaluation {
    pub fn is_balanced(&self) -> bool {
        self.decision == Decision::Enough
    }
}

/// Threshold configuration for the stopping rule
#[derive(Debug, Clone)]
pub struct StoppingPolicy {
    min_total: u64,
    min_per_category: u64,
    mandatory: BTreeSet<String>,
    max_loops: u32,
}

impl StoppingPolicy {
    pub fn new<I, S>(min_total: u64, min_per_category: u64, mandatory: I, max_loops: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            min_total,
            min_per_category,
            mandatory: mandatory
                .into_iter()
                .map(|name| normalize_category(name.as_ref()))
                .collect(),
            max_loops,
        }
    }

    /// Decide whether the cohort is good enough, needs more data, or must stop
    pub fn evaluate(&self, total: u64, counts: &CategoryCounts, remaining: usize, loop_count: u32) -> Evaluation {
        let enough_total = total >= self.min_total;

        let insufficient: BTreeMap<String, u64> = self
            .mandatory
            .iter()
            .filter_map(|category| {
                let count = counts.get(category).copied().unwrap_or(0);
                (count < self.min_per_category).then(|| (category.clone(), count))
            })
            .collect();
        let enough_per_type = insufficient.is_empty();

        let decision = if enough_total && enough_per_type {
            Decision::Enough
        } else if remaining == 0 || loop_count >= self.max_loops {
            Decision::Stop
        } else {
            Decision::NeedMore
        };

        Evaluation {
            decision,
            enough_total,
            enough_per_type,
            insufficient,
        }
    }

    pub fn min_total(&self) -> u64 {
        self.min_total
    }

    pub fn min_per_category(&self) -> u64 {
        self.min_per_category
    }

    pub fn mandatory(&self) -> &BTreeSet<String> {
        &self.mandatory
    }

    pub fn max_loops(&self) -> u32 {
        self.max_loops
    }
}
