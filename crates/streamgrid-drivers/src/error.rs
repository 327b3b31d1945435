//! Error types for driver operations.

use thiserror::Error;

pub type DriverResult<T> = Result<T, DriverError>;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("secret error: {0}")]
    Secret(String),

    #[error("connect error: {0}")]
    Connect(String),

    #[error("send error: {0}")]
    Send(String),

    #[error("receive error: {0}")]
    Recv(String),

    #[error("release error: {0}")]
    Release(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
