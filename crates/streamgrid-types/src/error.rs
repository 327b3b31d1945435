//! Validation errors for step specs.

use thiserror::Error;

/// A step spec that must not be scheduled. These are configuration
/// errors: they fail loudly and do not retry until the spec changes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidStep {
    #[error("step name is empty")]
    EmptyName,

    #[error("duplicate sink named {0:?}")]
    DuplicateSink(String),

    #[error("duplicate source named {0:?}")]
    DuplicateSource(String),

    #[error("sink {0:?} misconfigured: exactly one transport must be set")]
    MisconfiguredSink(String),

    #[error("source {0:?} misconfigured: exactly one transport must be set")]
    MisconfiguredSource(String),
}
