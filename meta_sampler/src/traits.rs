//! Collaborator trait definitions with mockall annotations for testing
//!
//! The workflow engine talks to the population source, the match-history
//! source and the normalizer only through these traits, so every stage can be
//! driven by mocks or fakes in tests.

use shared::{MatchRecord, ParticipantRef, RawBattle};

use crate::error::RetrievalError;

/// Ranked population source
///
/// Called once per run. Any failure, or an empty result, is fatal to the run.
#[mockall::automock]
#[async_trait::async_trait]
pub trait LeaderboardClient: Send + Sync {
    /// Fetch up to `limit` participants in leaderboard order
    ///
    /// # Returns
    /// Participants with `index` set to their position in the returned sequence
    async fn fetch_population(&self, limit: usize) -> Result<Vec<ParticipantRef>, RetrievalError>;
}

/// Per-participant match-history source
#[mockall::automock]
#[async_trait::async_trait]
pub trait BattlelogClient: Send + Sync {
    /// Fetch the recent battles of a participant, most recent first
    async fn fetch_recent(&self, tag: &str) -> Result<Vec<RawBattle>, RetrievalError>;
}

/// Classification of raw battles into categorized match records
#[mockall::automock]
pub trait Normalizer: Send + Sync {
    /// Keep only ranked single-opponent matches, preserving input order,
    /// and tag each with both deck categories
    fn filter_ranked_singles(&self, raw: &[RawBattle]) -> Vec<MatchRecord>;
}
