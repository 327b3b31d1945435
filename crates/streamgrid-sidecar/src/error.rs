//! Error types for the sidecar runtime.

use thiserror::Error;

use streamgrid_drivers::DriverError;
use streamgrid_types::InvalidStep;

/// Startup or runtime failure of the sidecar. Configuration errors are
/// fatal before the dataplane starts: they do not retry until the step
/// spec changes.
#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("duplicate sink named {0:?}")]
    DuplicateSink(String),

    #[error("duplicate source named {0:?}")]
    DuplicateSource(String),

    #[error("invalid step spec: {0}")]
    Invalid(#[from] InvalidStep),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Driver(#[from] DriverError),
}
