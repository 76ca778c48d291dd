//! Workflow state threaded through every stage of a run
//!
//! Created once when the population is loaded and mutated only by the
//! workflow engine. Nothing here outlives the run.

use shared::{Decision, MatchRecord, ParticipantRef};
use std::collections::{BTreeMap, HashSet};

use super::aggregator::{CategoryCounts, RecordAggregator};
use super::sampling::SamplingPool;

/// Aggregate state of one sampling run
pub struct WorkflowState {
    /// Population snapshot and used-index bookkeeping
    pub pool: SamplingPool,

    /// Batch selected by the most recent sampling stage
    pub selected: Vec<ParticipantRef>,

    /// Tags whose match history was already retrieved
    pub fetched_tags: HashSet<String>,

    /// Append-only accumulated records
    cohort: Vec<MatchRecord>,

    /// Incremental per-category counts over the cohort
    aggregator: RecordAggregator,

    pub loop_count: u32,
    /// Cohort length observed at each evaluation, in order
    pub cohort_sizes: Vec<usize>,
    pub decision: Option<Decision>,
    pub is_balanced: bool,
    pub insufficient: BTreeMap<String, u64>,

    /// Ordered, append-only audit trail
    notes: Vec<String>,
}

impl WorkflowState {
    pub fn new(pool: SamplingPool) -> Self {
        Self {
            pool,
            selected: Vec::new(),
            fetched_tags: HashSet::new(),
            cohort: Vec::new(),
            aggregator: RecordAggregator::new(),
            loop_count: 0,
            cohort_sizes: Vec::new(),
            decision: None,
            is_balanced: false,
            insufficient: BTreeMap::new(),
            notes: Vec::new(),
        }
    }

    /// Append records retrieved for one participant
    pub fn extend_cohort(&mut self, records: impl IntoIterator<Item = MatchRecord>) {
        self.cohort.extend(records);
    }

    /// Fold any records not yet counted
    pub fn aggregate(&mut self) -> (&CategoryCounts, u64) {
        self.aggregator.fold_cohort(&self.cohort)
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn cohort(&self) -> &[MatchRecord] {
        &self.cohort
    }

    pub fn counts(&self) -> &CategoryCounts {
        self.aggregator.counts()
    }

    pub fn total(&self) -> u64 {
        self.aggregator.total()
    }

    pub fn evaluations(&self) -> u32 {
        self.cohort_sizes.len() as u32
    }

    /// Consume the state, yielding the cohort and the audit trail
    pub fn into_parts(self) -> (Vec<MatchRecord>, CategoryCounts, Vec<String>) {
        let counts = self.aggregator.counts().clone();
        (self.cohort, counts, self.notes)
    }
}
