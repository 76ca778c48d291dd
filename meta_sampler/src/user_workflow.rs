//! Single-player analysis: fetch one battlelog, keep ranked 1v1 battles and
//! summarize them by deck category.

use serde::{Deserialize, Serialize};
use shared::{logging, normalize_tag, stage_info, MatchRecord, WorkflowStage};

use crate::core::CohortSummary;
use crate::error::{MetaError, MetaResult};
use crate::traits::{BattlelogClient, Normalizer};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReport {
    pub tag: String,
    /// Raw battlelog entries returned by the source
    pub battles_fetched: usize,
    pub ranked_battles: Vec<MatchRecord>,
    pub summary: CohortSummary,
    pub notes: Vec<String>,
}

pub struct UserAnalysis<B, N>
where
    B: BattlelogClient,
    N: Normalizer,
{
    battlelog: B,
    normalizer: N,
}

impl<B, N> UserAnalysis<B, N>
where
    B: BattlelogClient,
    N: Normalizer,
{
    pub fn new(battlelog: B, normalizer: N) -> Self {
        Self { battlelog, normalizer }
    }

    /// Analyze the recent ranked battles of one player.
    ///
    /// Retrieval errors propagate; an empty battlelog or one without ranked
    /// 1v1 battles is `NoRankedBattles`.
    pub async fn run(&self, tag: &str) -> MetaResult<UserReport> {
        let tag = normalize_tag(tag)?;
        let mut notes = Vec::new();

        let raw = self.battlelog.fetch_recent(&tag).await.map_err(|e| {
            logging::log_error(WorkflowStage::Fetch, "Battlelog fetch", &e);
            MetaError::from(e)
        })?;
        if raw.is_empty() {
            return Err(MetaError::NoRankedBattles { tag });
        }
        notes.push(format!("fetch: fetched {} battles for {tag}.", raw.len()));

        let ranked = self.normalizer.filter_ranked_singles(&raw);
        if ranked.is_empty() {
            return Err(MetaError::NoRankedBattles { tag });
        }
        notes.push(format!(
            "filter: kept {} ranked 1v1 battles out of {}.",
            ranked.len(),
            raw.len()
        ));

        let summary = CohortSummary::from_records(&ranked);
        notes.push(format!(
            "summary: games={}, wins={}, win_rate={:.1}%, opponent_types={}.",
            summary.games_played(),
            summary.overall.wins,
            summary.overall.win_rate() * 100.0,
            summary.opponent_categories.len()
        ));
        for note in &notes {
            stage_info!(WorkflowStage::Done, "{}", note);
        }

        Ok(UserReport {
            tag,
            battles_fetched: raw.len(),
            ranked_battles: ranked,
            summary,
            notes,
        })
    }
}
