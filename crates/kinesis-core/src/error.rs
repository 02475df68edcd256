//! Error types for the Kinesis pipeline
//!
//! The per-frame update functions are total and never return errors.
//! These variants only surface at the configuration and composition boundary.

use thiserror::Error;

/// Core Kinesis errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KinesisError {
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Unknown effect: {0}")]
    UnknownEffect(String),

    #[error("Channel kind mismatch on {channel}: expected {expected}, got {actual}")]
    ChannelKindMismatch {
        channel: String,
        expected: &'static str,
        actual: &'static str,
    },
}

impl KinesisError {
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        KinesisError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for Kinesis operations
pub type KinesisResult<T> = Result<T, KinesisError>;

/// Check that a coefficient lies in `[lo, hi]`.
pub fn ensure_range(field: &'static str, value: f32, lo: f32, hi: f32) -> KinesisResult<()> {
    if value.is_finite() && value >= lo && value <= hi {
        Ok(())
    } else {
        Err(KinesisError::invalid_config(
            field,
            format!("must be within [{lo}, {hi}], got {value}"),
        ))
    }
}

/// Check that a value is finite and strictly positive.
pub fn ensure_positive(field: &'static str, value: f32) -> KinesisResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(KinesisError::invalid_config(
            field,
            format!("must be positive, got {value}"),
        ))
    }
}
