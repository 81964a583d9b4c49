//! Error types for site-pulse-core

use thiserror::Error;

/// Result type alias for site-pulse-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the pure comparison engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid snapshot for site '{site_id}': {reason}")]
    InvalidSnapshot { site_id: String, reason: String },

    #[error("No usable snapshot for target site '{0}'")]
    MissingTarget(String),

    #[error("Malformed measurement: {0}")]
    MalformedMeasurement(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}
