//! Ranked 1v1 filter and deck classification
//!
//! Turns a raw battlelog page into categorized match records. Entries that
//! are not ranked single-opponent matches, or that do not decode, are
//! dropped without error.

use serde::Deserialize;
use shared::{MatchRecord, Outcome, RawBattle};
use std::fmt;

use crate::traits::Normalizer;

/// Battle types counted as ranked 1v1 (ladder and Path of Legend)
const RANKED_BATTLE_TYPES: &[&str] = &["pvp", "pathoflegend"];

const SIEGE_CARDS: &[&str] = &["x-bow", "mortar"];
const BAIT_CARDS: &[&str] = &["goblin barrel"];
const BEATDOWN_CARDS: &[&str] = &[
    "golem",
    "giant",
    "lava hound",
    "electro giant",
    "goblin giant",
    "elixir golem",
];
const BRIDGE_SPAM_CARDS: &[&str] = &["battle ram", "ram rider", "bandit", "royal ghost", "dark prince", "prince"];
const CYCLE_WIN_CONDITIONS: &[&str] = &["hog rider", "royal hogs", "miner", "wall breakers"];

/// Decks at or under this average elixir cost play as cycle
const CYCLE_MAX_AVG_ELIXIR: f64 = 3.0;
/// Cycle win conditions only count as cycle under this average
const CYCLE_WIN_CONDITION_MAX_AVG_ELIXIR: f64 = 3.6;

/// Deck archetypes recognised by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeckArchetype {
    Siege,
    Bait,
    Beatdown,
    BridgeSpam,
    Cycle,
    Hybrid,
}

impl DeckArchetype {
    pub fn label(&self) -> &'static str {
        match self {
            DeckArchetype::Siege => "Siege",
            DeckArchetype::Bait => "Bait",
            DeckArchetype::Beatdown => "Beatdown",
            DeckArchetype::BridgeSpam => "Bridge Spam",
            DeckArchetype::Cycle => "Cycle",
            DeckArchetype::Hybrid => "Hybrid",
        }
    }
}

impl fmt::Display for DeckArchetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a deck from its card names and, when known, average elixir.
///
/// Rules apply in order: siege, bait, beatdown, bridge spam, cycle; anything
/// else is hybrid.
pub fn classify_deck<'a>(card_names: impl IntoIterator<Item = &'a str>, avg_elixir: Option<f64>) -> DeckArchetype {
    let names: Vec<String> = card_names.into_iter().map(|n| n.trim().to_lowercase()).collect();
    let has_any = |set: &[&str]| names.iter().any(|n| set.contains(&n.as_str()));
    let count_of = |set: &[&str]| names.iter().filter(|n| set.contains(&n.as_str())).count();

    if has_any(SIEGE_CARDS) {
        return DeckArchetype::Siege;
    }
    if has_any(BAIT_CARDS) {
        return DeckArchetype::Bait;
    }
    if has_any(BEATDOWN_CARDS) {
        return DeckArchetype::Beatdown;
    }
    if count_of(BRIDGE_SPAM_CARDS) >= 2 {
        return DeckArchetype::BridgeSpam;
    }
    match avg_elixir {
        Some(avg) if avg <= CYCLE_MAX_AVG_ELIXIR => DeckArchetype::Cycle,
        Some(avg) if avg < CYCLE_WIN_CONDITION_MAX_AVG_ELIXIR && has_any(CYCLE_WIN_CONDITIONS) => DeckArchetype::Cycle,
        None if has_any(CYCLE_WIN_CONDITIONS) => DeckArchetype::Cycle,
        _ => DeckArchetype::Hybrid,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BattleEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    battle_time: String,
    game_mode: Option<GameMode>,
    #[serde(default)]
    team: Vec<BattleSide>,
    #[serde(default)]
    opponent: Vec<BattleSide>,
}

#[derive(Debug, Deserialize)]
struct GameMode {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BattleSide {
    #[serde(default)]
    tag: String,
    #[serde(default)]
    crowns: u32,
    #[serde(default)]
    cards: Vec<BattleCard>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BattleCard {
    name: String,
    elixir_cost: Option<u32>,
}

impl BattleSide {
    fn card_names(&self) -> Vec<String> {
        self.cards.iter().map(|c| c.name.clone()).collect()
    }

    /// Average elixir, only when every card reports its cost
    fn avg_elixir(&self) -> Option<f64> {
        if self.cards.is_empty() {
            return None;
        }
        let costs: Option<Vec<u32>> = self.cards.iter().map(|c| c.elixir_cost).collect();
        costs.map(|costs| costs.iter().sum::<u32>() as f64 / costs.len() as f64)
    }

    fn archetype(&self) -> DeckArchetype {
        classify_deck(self.cards.iter().map(|c| c.name.as_str()), self.avg_elixir())
    }
}

/// Normalizer for ranked ladder and Path of Legend 1v1 battles
#[derive(Debug, Clone, Default)]
pub struct RankedSinglesNormalizer;

impl RankedSinglesNormalizer {
    pub fn new() -> Self {
        Self
    }

    fn normalize_entry(raw: &RawBattle) -> Option<MatchRecord> {
        let entry = BattleEntry::deserialize(raw).ok()?;

        let kind = entry.kind.to_lowercase();
        if !RANKED_BATTLE_TYPES.contains(&kind.as_str()) {
            return None;
        }
        let (player, opponent) = match (entry.team.as_slice(), entry.opponent.as_slice()) {
            ([player], [opponent]) => (player, opponent),
            _ => return None,
        };

        Some(MatchRecord {
            battle_time: entry.battle_time.clone(),
            game_mode: entry
                .game_mode
                .as_ref()
                .and_then(|mode| mode.name.clone())
                .unwrap_or_else(|| entry.kind.clone()),
            player_tag: player.tag.clone(),
            category: player.archetype().label().to_string(),
            opponent_category: opponent.archetype().label().to_string(),
            outcome: Outcome::from_crowns(player.crowns, opponent.crowns),
            player_crowns: player.crowns,
            opponent_crowns: opponent.crowns,
            player_cards: player.card_names(),
            opponent_cards: opponent.card_names(),
        })
    }
}

impl Normalizer for RankedSinglesNormalizer {
    fn filter_ranked_singles(&self, raw: &[RawBattle]) -> Vec<MatchRecord> {
        raw.iter().filter_map(Self::normalize_entry).collect()
    }
}
