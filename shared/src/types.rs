//! Core types used throughout the sampler

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{SharedError, SharedResult};

/// Raw battlelog entry as returned by the match-history source.
///
/// The wire format is owned by the source; the sampler only hands these to a
/// normalizer.
pub type RawBattle = serde_json::Value;

/// Category bucket used for records whose label is blank after trimming
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Display metadata captured with a participant in the population snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantMetadata {
    pub name: Option<String>,
    pub rank: Option<u32>,
    pub rating: Option<u32>,
    pub clan: Option<String>,
}

/// One member of the ranked population
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRef {
    pub tag: String,
    pub index: usize,
    #[serde(default)]
    pub metadata: ParticipantMetadata,
}

impl ParticipantRef {
    pub fn new(tag: impl Into<String>, index: usize) -> Self {
        Self {
            tag: tag.into(),
            index,
            metadata: ParticipantMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ParticipantMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Result of a match from the local player's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    /// Derive the outcome from crowns taken by each side
    pub fn from_crowns(player_crowns: u32, opponent_crowns: u32) -> Self {
        match player_crowns.cmp(&opponent_crowns) {
            std::cmp::Ordering::Greater => Outcome::Win,
            std::cmp::Ordering::Less => Outcome::Loss,
            std::cmp::Ordering::Equal => Outcome::Draw,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Loss => write!(f, "loss"),
            Outcome::Draw => write!(f, "draw"),
        }
    }
}

/// A normalized ranked 1v1 match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub battle_time: String,
    pub game_mode: String,
    pub player_tag: String,
    /// Deck category of the local player
    pub category: String,
    /// Deck category of the opponent; drives coverage counting
    pub opponent_category: String,
    pub outcome: Outcome,
    pub player_crowns: u32,
    pub opponent_crowns: u32,
    #[serde(default)]
    pub player_cards: Vec<String>,
    #[serde(default)]
    pub opponent_cards: Vec<String>,
}

/// Stopping decision produced at each evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Enough,
    NeedMore,
    Stop,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Enough => write!(f, "enough"),
            Decision::NeedMore => write!(f, "need_more"),
            Decision::Stop => write!(f, "stop"),
        }
    }
}

/// Stages of the sampling workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowStage {
    Init,
    SampleInitial,
    Fetch,
    Aggregate,
    Evaluate,
    SampleMore,
    Done,
}

impl WorkflowStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStage::Done)
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStage::Init => write!(f, "init"),
            WorkflowStage::SampleInitial => write!(f, "sample_initial"),
            WorkflowStage::Fetch => write!(f, "fetch"),
            WorkflowStage::Aggregate => write!(f, "aggregate"),
            WorkflowStage::Evaluate => write!(f, "evaluate"),
            WorkflowStage::SampleMore => write!(f, "sample_more"),
            WorkflowStage::Done => write!(f, "done"),
        }
    }
}

/// Normalize a category label into its counting key.
///
/// Case variants and surrounding whitespace merge into one bucket; blank
/// labels land in [`UNKNOWN_CATEGORY`].
pub fn normalize_category(label: &str) -> String {
    let key = label.trim().to_lowercase();
    if key.is_empty() {
        UNKNOWN_CATEGORY.to_string()
    } else {
        key
    }
}

/// Normalize a user-supplied player tag to the `#XXXX` form used by the API
pub fn normalize_tag(input: &str) -> SharedResult<String> {
    let trimmed = input.trim().trim_start_matches('#');
    if trimmed.is_empty() {
        return Err(SharedError::EmptyTag);
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(SharedError::InvalidTag {
            input: input.to_string(),
        });
    }
    Ok(format!("#{}", trimmed.to_ascii_uppercase()))
}
