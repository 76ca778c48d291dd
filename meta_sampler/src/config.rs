//! Run configuration
//!
//! Every threshold and batch size is overridable. Values come from the
//! defaults below, then an optional JSON file, then command-line flags.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::StoppingPolicy;
use crate::error::{MetaError, MetaResult};

pub const DEFAULT_MIN_TOTAL: u64 = 500;
pub const DEFAULT_MIN_PER_CATEGORY: u64 = 50;
pub const DEFAULT_MANDATORY_CATEGORIES: [&str; 5] = ["siege", "bait", "cycle", "bridge spam", "beatdown"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Global minimum number of records
    pub min_total: u64,
    /// Minimum records per mandatory category
    pub min_per_category: u64,
    /// Categories that must each reach `min_per_category` (case-insensitive)
    pub mandatory_categories: Vec<String>,
    pub initial_batch_size: usize,
    pub incremental_batch_size: usize,
    pub max_loops: u32,
    /// Most-recent records kept per participant
    pub records_per_participant: usize,
    /// Population size requested from the leaderboard
    pub population_limit: usize,
    /// Concurrent match-history requests per batch
    pub worker_limit: usize,
    pub fetch_timeout_ms: u64,
    /// Wall-clock budget for the whole run
    pub run_deadline_secs: Option<u64>,
    /// Seed for reproducible sampling
    pub seed: Option<u64>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            min_total: DEFAULT_MIN_TOTAL,
            min_per_category: DEFAULT_MIN_PER_CATEGORY,
            mandatory_categories: DEFAULT_MANDATORY_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            initial_batch_size: 50,
            incremental_batch_size: 5,
            max_loops: 20,
            records_per_participant: 10,
            population_limit: 300,
            worker_limit: 4,
            fetch_timeout_ms: 10_000,
            run_deadline_secs: None,
            seed: None,
        }
    }
}

impl WorkflowConfig {
    /// Load a config file; missing keys keep their defaults.
    ///
    /// An unreadable file is `ConfigFile`, malformed contents are `Json`.
    pub fn from_file(path: impl AsRef<Path>) -> MetaResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| MetaError::ConfigFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Reject settings that would stall the loop or make it meaningless
    pub fn validate(&self) -> MetaResult<()> {
        if self.initial_batch_size == 0 {
            return Err(MetaError::config("initial_batch_size must be at least 1"));
        }
        if self.incremental_batch_size == 0 {
            return Err(MetaError::config("incremental_batch_size must be at least 1"));
        }
        if self.records_per_participant == 0 {
            return Err(MetaError::config("records_per_participant must be at least 1"));
        }
        if self.population_limit == 0 {
            return Err(MetaError::config("population_limit must be at least 1"));
        }
        if self.worker_limit == 0 {
            return Err(MetaError::config("worker_limit must be at least 1"));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(MetaError::config("fetch_timeout_ms must be greater than 0"));
        }
        if self.mandatory_categories.iter().all(|c| c.trim().is_empty()) {
            return Err(MetaError::config("mandatory_categories must name at least one category"));
        }
        Ok(())
    }

    pub fn policy(&self) -> StoppingPolicy {
        StoppingPolicy::new(
            self.min_total,
            self.min_per_category,
            self.mandatory_categories.iter().filter(|c| !c.trim().is_empty()),
            self.max_loops,
        )
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn run_deadline(&self) -> Option<Duration> {
        self.run_deadline_secs.map(Duration::from_secs)
    }
}
