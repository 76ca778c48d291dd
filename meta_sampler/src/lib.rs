//! Meta dataset sampler
//!
//! Builds a category-balanced cohort of ranked 1v1 match records from the
//! match histories of a leaderboard population. Sampling continues in small
//! waves until every mandatory deck category is covered, the loop budget runs
//! out or the population is exhausted.

pub mod config;
pub mod core;
pub mod error;
pub mod services;
pub mod traits;
pub mod user_workflow;
pub mod workflow;

// Re-export commonly used types
pub use config::WorkflowConfig;
pub use self::core::{CohortSummary, RecordAggregator, SamplingPool, StoppingPolicy, WorkflowState};
pub use error::{MetaError, MetaResult, RetrievalError};
pub use traits::{BattlelogClient, LeaderboardClient, Normalizer};
pub use user_workflow::{UserAnalysis, UserReport};
pub use workflow::{RunReport, ShutdownHandle, WorkflowEngine};
