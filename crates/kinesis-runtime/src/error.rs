//! Session-level errors

use kinesis_core::KinesisError;
use thiserror::Error;

/// Errors raised while configuring or starting a session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] KinesisError),

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
