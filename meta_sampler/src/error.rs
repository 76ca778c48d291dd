//! Sampler-specific error types

use shared::SharedError;
use std::time::Duration;
use thiserror::Error;

/// Failure to retrieve one participant's match history.
///
/// Recovered locally by the workflow: the participant is skipped and the
/// failure is written to the audit trail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    #[error("request for {target} timed out after {timeout:?}")]
    Timeout { target: String, timeout: Duration },

    #[error("network error for {target}: {message}")]
    Network { target: String, message: String },

    #[error("HTTP {status} for {target}")]
    Status { target: String, status: u16 },

    #[error("could not decode response for {target}: {message}")]
    Decode { target: String, message: String },

    #[error("API token is not configured")]
    MissingToken,
}

#[derive(Error, Debug)]
pub enum MetaError {
    #[error("Population source unavailable: {reason}")]
    PopulationUnavailable { reason: String },

    #[error("Population source returned no participants")]
    EmptyPopulation,

    #[error("Configuration error: {field}")]
    ConfigurationError { field: String },

    #[error("Config file error: {path}: {message}")]
    ConfigFile { path: String, message: String },

    #[error("No ranked 1v1 battles found for {tag}")]
    NoRankedBattles { tag: String },

    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MetaError {
    pub fn config(field: impl Into<String>) -> Self {
        MetaError::ConfigurationError { field: field.into() }
    }

    /// Whether this error aborts a run before any sampling happened
    pub fn is_fatal_startup(&self) -> bool {
        matches!(
            self,
            MetaError::PopulationUnavailable { .. } | MetaError::EmptyPopulation
        )
    }
}

pub type MetaResult<T> = Result<T, MetaError>;
