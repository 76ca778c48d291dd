//! Shared error types for the meta dataset sampler

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Participant tag is empty")]
    EmptyTag,

    #[error("Invalid participant tag: {input}")]
    InvalidTag { input: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
