//! Meta dataset workflow engine
//!
//! Drives the sample → fetch → aggregate → evaluate loop as an explicit state
//! machine. The loop is bounded by the configured loop budget and by
//! population exhaustion, and can be cut short by a shutdown signal or a run
//! deadline.

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use uuid::Uuid;

use shared::{
    logging, stage_debug, stage_error, stage_info, stage_warn, Decision, MatchRecord, ParticipantRef, WorkflowStage,
};

use crate::{
    config::WorkflowConfig,
    core::{CategoryCounts, SamplingPool, StoppingPolicy, WorkflowState},
    error::{MetaError, MetaResult, RetrievalError},
    traits::{BattlelogClient, LeaderboardClient, Normalizer},
};

/// Final output of a sampling run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub population_size: usize,
    pub participants_sampled: usize,
    pub participants_fetched: usize,
    pub cohort: Vec<MatchRecord>,
    pub category_counts: CategoryCounts,
    pub total: u64,
    pub is_balanced: bool,
    pub decision: Decision,
    pub loop_count: u32,
    pub evaluations: u32,
    /// Cohort length at each evaluation
    pub cohort_sizes: Vec<usize>,
    /// Mandatory categories still below threshold at the last evaluation
    pub insufficient: BTreeMap<String, u64>,
    pub audit_notes: Vec<String>,
}

/// Requests an early stop of a running workflow
#[derive(Clone)]
pub struct ShutdownHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        let _ = self.sender.send(true);
    }
}

/// Per-participant retrieval result, gathered before touching the state
type Retrieved = (ParticipantRef, Result<Vec<MatchRecord>, RetrievalError>);

/// Workflow engine over injected population, match-history and normalizer
/// collaborators
pub struct WorkflowEngine<L, B, N>
where
    L: LeaderboardClient,
    B: BattlelogClient,
    N: Normalizer,
{
    config: WorkflowConfig,
    policy: StoppingPolicy,

    /// Injected collaborators
    leaderboard: L,
    battlelog: B,
    normalizer: N,

    /// Shutdown signal
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl<L, B, N> WorkflowEngine<L, B, N>
where
    L: LeaderboardClient,
    B: BattlelogClient,
    N: Normalizer,
{
    /// Create an engine after validating the configuration
    pub fn new(config: WorkflowConfig, leaderboard: L, battlelog: B, normalizer: N) -> MetaResult<Self> {
        config.validate()?;
        let policy = config.policy();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config,
            policy,
            leaderboard,
            battlelog,
            normalizer,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        })
    }

    /// Get a handle that stops the run at the next opportunity
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            sender: Arc::clone(&self.shutdown_tx),
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run the workflow to completion.
    ///
    /// Only a failure to load the population is returned as an error; every
    /// per-participant failure is recorded in the audit notes instead.
    pub async fn run(&self) -> MetaResult<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        // A budget past the clock's range means no deadline
        let deadline = self
            .config
            .run_deadline()
            .and_then(|budget| Instant::now().checked_add(budget));
        logging::log_startup(&format!("meta sampling run {run_id}"));

        let mut state = self.init().await?;
        let population_size = state.pool.population_size();

        let mut stage = WorkflowStage::SampleInitial;
        while !stage.is_terminal() {
            if self.cancel_requested(deadline) {
                self.finish_cancelled(&mut state, stage);
                break;
            }

            stage = match stage {
                WorkflowStage::SampleInitial => self.sample_initial(&mut state),
                WorkflowStage::Fetch => self.fetch(&mut state, deadline).await,
                WorkflowStage::Aggregate => self.aggregate(&mut state),
                WorkflowStage::Evaluate => self.evaluate(&mut state),
                WorkflowStage::SampleMore => self.sample_more(&mut state),
                WorkflowStage::Init | WorkflowStage::Done => WorkflowStage::Done,
            };
        }

        let decision = state.decision.unwrap_or(Decision::Stop);
        logging::log_success(
            WorkflowStage::Done,
            &format!(
                "Run {run_id} finished: decision={decision}, total={}, loops={}",
                state.total(),
                state.loop_count
            ),
        );

        let participants_sampled = state.pool.used_indices().len();
        let participants_fetched = state.fetched_tags.len();
        let is_balanced = state.is_balanced;
        let loop_count = state.loop_count;
        let evaluations = state.evaluations();
        let total = state.total();
        let cohort_sizes = std::mem::take(&mut state.cohort_sizes);
        let insufficient = std::mem::take(&mut state.insufficient);
        let (cohort, category_counts, audit_notes) = state.into_parts();

        Ok(RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            population_size,
            participants_sampled,
            participants_fetched,
            cohort,
            category_counts,
            total,
            is_balanced,
            decision,
            loop_count,
            evaluations,
            cohort_sizes,
            insufficient,
            audit_notes,
        })
    }

    /// INIT: load the population and build the run state
    async fn init(&self) -> MetaResult<WorkflowState> {
        let stage = WorkflowStage::Init;
        let limit = self.config.population_limit;
        let timeout = self.config.fetch_timeout();

        let fetched = match tokio::time::timeout(timeout, self.leaderboard.fetch_population(limit)).await {
            Ok(result) => result,
            Err(_) => Err(RetrievalError::Timeout {
                target: "leaderboard".to_string(),
                timeout,
            }),
        };

        let mut population = match fetched {
            Ok(population) => population,
            Err(e) => {
                stage_error!(stage, "❌ Population fetch failed (limit={}): {}", limit, e);
                return Err(MetaError::PopulationUnavailable { reason: e.to_string() });
            }
        };

        if population.is_empty() {
            stage_error!(stage, "❌ Population fetch returned no participants (limit={})", limit);
            return Err(MetaError::EmptyPopulation);
        }

        // Indices always mirror positions in the snapshot
        for (position, participant) in population.iter_mut().enumerate() {
            participant.index = position;
        }

        let count = population.len();
        let pool = match self.config.seed {
            Some(seed) => SamplingPool::with_seed(population, seed),
            None => SamplingPool::new(population),
        };

        let mut state = WorkflowState::new(pool);
        self.record(&mut state, stage, format!("init: fetched {count} top players from leaderboard (limit={limit})"));
        Ok(state)
    }

    /// SAMPLE_INITIAL: draw the first cohort of participants
    fn sample_initial(&self, state: &mut WorkflowState) -> WorkflowStage {
        let stage = WorkflowStage::SampleInitial;
        let batch = state.pool.sample_initial(self.config.initial_batch_size);

        let note = format!(
            "sample_initial: sampled {} players out of {}.",
            batch.len(),
            state.pool.population_size()
        );
        state.selected = batch;
        self.record(state, stage, note);

        WorkflowStage::Fetch
    }

    /// SAMPLE_MORE: draw an incremental batch and count the loop
    fn sample_more(&self, state: &mut WorkflowState) -> WorkflowStage {
        let stage = WorkflowStage::SampleMore;
        let batch = state.pool.sample_more(self.config.incremental_batch_size);
        state.loop_count += 1;

        let note = if batch.is_empty() {
            format!(
                "sample_more: loop {} - no unused players left; cannot sample more.",
                state.loop_count
            )
        } else {
            format!(
                "sample_more: loop {} - sampled {} more players; total_used={}/{}.",
                state.loop_count,
                batch.len(),
                state.pool.used_indices().len(),
                state.pool.population_size()
            )
        };
        state.selected = batch;
        self.record(state, stage, note);

        WorkflowStage::Fetch
    }

    /// FETCH: retrieve and normalize the selected batch
    async fn fetch(&self, state: &mut WorkflowState, deadline: Option<Instant>) -> WorkflowStage {
        let stage = WorkflowStage::Fetch;
        let selected = std::mem::take(&mut state.selected);

        if selected.is_empty() {
            self.record(state, stage, "fetch: no selected players; nothing to fetch.");
            return WorkflowStage::Aggregate;
        }

        let mut seen_in_batch = HashSet::new();
        let mut pending = Vec::with_capacity(selected.len());
        for participant in selected {
            if participant.tag.trim().is_empty() {
                stage_debug!(stage, "Skipping participant #{} with empty tag", participant.index);
                continue;
            }
            if state.fetched_tags.contains(&participant.tag) || !seen_in_batch.insert(participant.tag.clone()) {
                stage_debug!(stage, "Skipping {}: already fetched this run", participant.tag);
                continue;
            }
            pending.push(participant);
        }

        let retrieved = {
            let mut cancel_rx = self.shutdown_rx.clone();
            tokio::select! {
                results = self.retrieve_batch(pending) => Some(results),
                _ = wait_for_cancel(&mut cancel_rx, deadline) => None,
            }
        };

        let Some(retrieved) = retrieved else {
            self.record(state, stage, "fetch: cancelled mid-batch; partial batch discarded.");
            self.finish_cancelled(state, stage);
            return WorkflowStage::Done;
        };

        let mut new_battles = 0usize;
        let mut new_players = 0usize;
        let mut failed = 0usize;
        for (participant, result) in retrieved {
            match result {
                Ok(records) => {
                    stage_debug!(stage, "Fetched {} ranked battles for {}", records.len(), participant.tag);
                    new_battles += records.len();
                    new_players += 1;
                    state.fetched_tags.insert(participant.tag);
                    state.extend_cohort(records);
                }
                Err(e) => {
                    failed += 1;
                    stage_warn!(stage, "⚠️ Skipping {}: {}", participant.tag, e);
                    state.note(format!("fetch: error fetching {}: {}", participant.tag, e));
                }
            }
        }

        let note = format!(
            "fetch: fetched {new_battles} normalized ranked 1v1 battles from {new_players} new players \
             ({failed} failed). total_meta_battles={}",
            state.cohort().len()
        );
        self.record(state, stage, note);

        WorkflowStage::Aggregate
    }

    /// Fan out retrievals with bounded concurrency, keeping batch order
    async fn retrieve_batch(&self, batch: Vec<ParticipantRef>) -> Vec<Retrieved> {
        let timeout = self.config.fetch_timeout();
        let cap = self.config.records_per_participant;

        stream::iter(batch)
            .map(move |participant| async move {
                let result = match tokio::time::timeout(timeout, self.battlelog.fetch_recent(&participant.tag)).await {
                    Ok(Ok(raw)) => {
                        let mut records = self.normalizer.filter_ranked_singles(&raw);
                        records.truncate(cap);
                        Ok(records)
                    }
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(RetrievalError::Timeout {
                        target: participant.tag.clone(),
                        timeout,
                    }),
                };
                (participant, result)
            })
            .buffered(self.config.worker_limit)
            .collect::<Vec<Retrieved>>()
            .await
    }

    /// AGGREGATE: bring category counts up to date with the cohort
    fn aggregate(&self, state: &mut WorkflowState) -> WorkflowStage {
        let stage = WorkflowStage::Aggregate;
        let (counts, total) = state.aggregate();
        let note = format!(
            "aggregate: games_total={total}, deck_types_opp={}",
            counts.len()
        );
        self.record(state, stage, note);

        WorkflowStage::Evaluate
    }

    /// EVALUATE: apply the stopping rule and route
    fn evaluate(&self, state: &mut WorkflowState) -> WorkflowStage {
        let stage = WorkflowStage::Evaluate;
        let total = state.total();
        let remaining = state.pool.remaining();
        let evaluation = self.policy.evaluate(total, state.counts(), remaining, state.loop_count);

        let cohort_len = state.cohort().len();
        state.cohort_sizes.push(cohort_len);
        state.decision = Some(evaluation.decision);
        state.is_balanced = evaluation.is_balanced();

        let note = match evaluation.decision {
            Decision::Enough => format!(
                "evaluate: enough data. games_total={total}, all required deck types >= {}.",
                self.policy.min_per_category()
            ),
            Decision::Stop => format!(
                "evaluate: stopping. games_total={total}, remaining_players={remaining}, \
                 loop_count={}, insufficient_types={:?}.",
                state.loop_count, evaluation.insufficient
            ),
            Decision::NeedMore => format!(
                "evaluate: need more data. games_total={total}, remaining_players={remaining}, \
                 loop_count={}, insufficient_types={:?}.",
                state.loop_count, evaluation.insufficient
            ),
        };
        state.insufficient = evaluation.insufficient;
        self.record(state, stage, note);

        match evaluation.decision {
            Decision::NeedMore => WorkflowStage::SampleMore,
            Decision::Enough | Decision::Stop => WorkflowStage::Done,
        }
    }

    fn cancel_requested(&self, deadline: Option<Instant>) -> bool {
        *self.shutdown_rx.borrow() || deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn finish_cancelled(&self, state: &mut WorkflowState, stage: WorkflowStage) {
        state.decision = Some(Decision::Stop);
        state.is_balanced = false;
        let note = format!(
            "cancelled: shutdown or deadline reached during {stage}; stopping with {} battles.",
            state.total()
        );
        self.record(state, stage, note);
    }

    fn record(&self, state: &mut WorkflowState, stage: WorkflowStage, note: impl Into<String>) {
        let note = note.into();
        stage_info!(stage, "{}", note);
        state.note(note);
    }
}

/// Resolve once shutdown is signalled or the deadline passes
async fn wait_for_cancel(rx: &mut watch::Receiver<bool>, deadline: Option<Instant>) {
    let signalled = async {
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    };

    match deadline {
        Some(deadline) => {
            tokio::select! {
                _ = signalled => {},
                _ = tokio::time::sleep_until(deadline) => {},
            }
        }
        None => signalled.await,
    }
}
