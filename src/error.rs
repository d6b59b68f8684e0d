//! Error kinds surfaced to callers.
//!
//! Validation failures are rejected before any store access; store and
//! transport failures are a separate kind so callers can decide to retry.
//! Missing ids are not errors: operations report them as `false` / `None`.

use std::time::Duration;

use thiserror::Error;

/// Malformed or out-of-range caller input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} exceeds {max} characters (got {len})")]
    TooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },

    #[error("at most {max} tags allowed (got {count})")]
    TooManyTags { max: usize, count: usize },

    #[error("confidence must be between 0.0 and 1.0 (got {0})")]
    Confidence(f64),

    #[error("unknown source '{0}'")]
    UnknownSource(String),

    #[error("unknown memory type '{0}'")]
    UnknownMemoryType(String),

    #[error("id must be a positive integer (got {0})")]
    InvalidId(i64),

    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("cannot merge entry {0} into itself")]
    SelfMerge(i64),
}

/// Failure of a service operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("store failure: {0:#}")]
    Store(#[from] anyhow::Error),

    #[error("store did not respond within {0:?}")]
    Timeout(Duration),

    #[error("background task failed: {0}")]
    Task(String),
}

impl ServiceError {
    /// Store failures and timeouts may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Timeout(_))
    }
}
