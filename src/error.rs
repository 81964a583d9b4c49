//! Error types for site-pulse

use thiserror::Error;

/// Result type alias for site-pulse operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for site-pulse
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Core(#[from] site_pulse_core::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to read file: {path}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// True when the run was aborted because the target could not be measured
    pub fn is_missing_target(&self) -> bool {
        matches!(self, Error::Core(site_pulse_core::Error::MissingTarget(_)))
    }
}
