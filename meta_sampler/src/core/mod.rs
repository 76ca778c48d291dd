//! Core business logic modules
//!
//! This module contains pure business logic with no I/O dependencies.
//! Everything here is deterministic given a seed and easily testable.

pub mod aggregator;
pub mod policy;
pub mod sampling;
pub mod state;
pub mod summary;

pub use aggregator::{CategoryCounts, RecordAggregator};
pub use policy::{Evaluation, StoppingPolicy};
pub use sampling::SamplingPool;
pub use state::WorkflowState;
pub use summary::{CategoryStats, CohortSummary};
