//! Test fixtures for workflow scenarios
//!
//! Raw battles here are not API-shaped: each carries the opponent category
//! directly, and the fake normalizer reads it back.

use serde_json::{json, Value};
use shared::{MatchRecord, Outcome, ParticipantRef, RawBattle};

pub struct TestFixtures;

impl TestFixtures {
    pub const SIEGE: &'static str = "siege";
    pub const BAIT: &'static str = "bait";
    pub const HYBRID: &'static str = "Hybrid";

    /// Participants tagged `#P0`, `#P1`, ...
    pub fn participants(n: usize) -> Vec<ParticipantRef> {
        (0..n).map(|i| ParticipantRef::new(Self::tag(i), i)).collect()
    }

    pub fn tag(i: usize) -> String {
        format!("#P{i}")
    }

    pub fn raw_battle(opponent_category: &str, ranked: bool) -> RawBattle {
        json!({ "opponent_category": opponent_category, "ranked": ranked })
    }

    pub fn raw_battles(n: usize, opponent_category: &str) -> Vec<RawBattle> {
        (0..n).map(|_| Self::raw_battle(opponent_category, true)).collect()
    }

    /// Record built from a fixture battle for the given player
    pub fn record_from(raw: &Value, player_tag: &str) -> MatchRecord {
        MatchRecord {
            battle_time: String::new(),
            game_mode: "Ladder".to_string(),
            player_tag: player_tag.to_string(),
            category: Self::HYBRID.to_string(),
            opponent_category: raw["opponent_category"].as_str().unwrap_or_default().to_string(),
            outcome: Outcome::Win,
            player_crowns: 1,
            opponent_crowns: 0,
            player_cards: Vec::new(),
            opponent_cards: Vec::new(),
        }
    }
}
