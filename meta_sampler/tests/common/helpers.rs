//! Fakes for the collaborator traits and shared assertions

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use meta_sampler::{BattlelogClient, LeaderboardClient, Normalizer, RetrievalError, RunReport, WorkflowConfig};
use shared::{MatchRecord, ParticipantRef, RawBattle};

use super::fixtures::TestFixtures;

/// Leaderboard returning a fixed population
pub struct FakeLeaderboard {
    population: Vec<ParticipantRef>,
}

impl FakeLeaderboard {
    pub fn new(population: Vec<ParticipantRef>) -> Self {
        Self { population }
    }

    pub fn with_size(n: usize) -> Self {
        Self::new(TestFixtures::participants(n))
    }
}

#[async_trait]
impl LeaderboardClient for FakeLeaderboard {
    async fn fetch_population(&self, limit: usize) -> Result<Vec<ParticipantRef>, RetrievalError> {
        Ok(self.population.iter().take(limit).cloned().collect())
    }
}

/// Battlelog serving the same page to every tag, with per-tag delays and
/// failures, counting calls per tag
#[derive(Clone)]
pub struct FakeBattlelog {
    page: Vec<RawBattle>,
    overrides: HashMap<String, Vec<RawBattle>>,
    delays: HashMap<String, Duration>,
    default_delay: Option<Duration>,
    failures: HashSet<String>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl FakeBattlelog {
    pub fn new(page: Vec<RawBattle>) -> Self {
        Self {
            page,
            overrides: HashMap::new(),
            delays: HashMap::new(),
            default_delay: None,
            failures: HashSet::new(),
            calls: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_page_for(mut self, tag: &str, page: Vec<RawBattle>) -> Self {
        self.overrides.insert(tag.to_string(), page);
        self
    }

    pub fn with_delay_for(mut self, tag: &str, delay: Duration) -> Self {
        self.delays.insert(tag.to_string(), delay);
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub fn failing_for(mut self, tag: &str) -> Self {
        self.failures.insert(tag.to_string());
        self
    }

    /// Shared call counter, readable after the fake moves into an engine
    pub fn calls(&self) -> Arc<Mutex<HashMap<String, usize>>> {
        Arc::clone(&self.calls)
    }

    /// Highest number of overlapping `fetch_recent` calls seen so far
    pub fn peak_in_flight(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.peak_in_flight)
    }
}

#[async_trait]
impl BattlelogClient for FakeBattlelog {
    async fn fetch_recent(&self, tag: &str) -> Result<Vec<RawBattle>, RetrievalError> {
        *self.calls.lock().unwrap().entry(tag.to_string()).or_insert(0) += 1;
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(tag).copied().or(self.default_delay) {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failures.contains(tag) {
            return Err(RetrievalError::Status {
                target: tag.to_string(),
                status: 500,
            });
        }
        Ok(self.overrides.get(tag).unwrap_or(&self.page).clone())
    }
}

/// Normalizer keeping fixture battles flagged as ranked
pub struct FakeNormalizer;

impl Normalizer for FakeNormalizer {
    fn filter_ranked_singles(&self, raw: &[RawBattle]) -> Vec<MatchRecord> {
        raw.iter()
            .filter(|battle| battle["ranked"].as_bool().unwrap_or(false))
            .map(|battle| TestFixtures::record_from(battle, "#FAKE"))
            .collect()
    }
}

pub struct TestHelpers;

impl TestHelpers {
    /// Small seeded configuration with a single mandatory category
    pub fn config(min_total: u64, min_per_category: u64, mandatory: &[&str]) -> WorkflowConfig {
        WorkflowConfig {
            min_total,
            min_per_category,
            mandatory_categories: mandatory.iter().map(|s| s.to_string()).collect(),
            initial_batch_size: 5,
            incremental_batch_size: 2,
            max_loops: 20,
            records_per_participant: 10,
            population_limit: 300,
            worker_limit: 4,
            fetch_timeout_ms: 2_000,
            run_deadline_secs: None,
            seed: Some(42),
        }
    }

    /// Invariants every finished run must hold
    pub fn assert_report_invariants(report: &RunReport, config: &WorkflowConfig) {
        assert!(
            report.cohort_sizes.windows(2).all(|w| w[0] <= w[1]),
            "cohort must never shrink: {:?}",
            report.cohort_sizes
        );
        assert!(report.evaluations <= config.max_loops + 1);
        assert!(report.loop_count <= config.max_loops);
        assert_eq!(report.total, report.cohort.len() as u64);
        assert_eq!(report.category_counts.values().sum::<u64>(), report.total);
        assert!(report.participants_sampled <= report.population_size);
        assert_eq!(report.is_balanced, report.decision == shared::Decision::Enough);
    }

    pub fn max_calls_per_tag(calls: &Arc<Mutex<HashMap<String, usize>>>) -> usize {
        calls.lock().unwrap().values().copied().max().unwrap_or(0)
    }
}
