// src/error.rs

use thiserror::Error;

/// Errors raised by the waveform core.
///
/// Precondition violations (`InvalidArgument`) are programming errors on the
/// caller's side and are reported immediately instead of being clamped.
#[derive(Error, Debug)]
pub enum WaveError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No sample source loaded")]
    NoSource,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WaveError>;

pub(crate) fn invalid(msg: impl Into<String>) -> WaveError {
    WaveError::InvalidArgument(msg.into())
}
