//! Tuner Error Types

use thiserror::Error;

/// Recoverable errors from configuration and tuning handling.
///
/// Misuse of the DSP entry points (odd-length blocks, non-positive
/// frequencies) panics instead; those are caller bugs, not runtime conditions.
#[derive(Error, Debug)]
pub enum TunerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid tuning: {0}")]
    InvalidTuning(String),
}

/// Result type alias for tuner operations
pub type TunerResult<T> = Result<T, TunerError>;
