//! Error types for scheduler operations.

use thiserror::Error;

/// Result type alias for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors surfaced by a scheduler adapter.
///
/// `NotFound`, `AlreadyExists`, and `Conflict` are recoverable by
/// policy: callers check the predicates below and continue. Everything
/// else is transient and retried by re-enqueueing the key.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("deadline exceeded: {0}")]
    Timeout(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("exec error: {0}")]
    Exec(String),
}

impl SchedulerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SchedulerError::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, SchedulerError::AlreadyExists(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, SchedulerError::Conflict(_))
    }
}
