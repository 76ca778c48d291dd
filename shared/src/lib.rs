//! Shared types for the meta dataset sampler
//!
//! Contains the record and participant types exchanged between the sampling
//! workflow and its collaborators, plus the logging setup used by every
//! binary in the workspace.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;
