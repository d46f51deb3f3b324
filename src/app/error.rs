use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RatecastError {
    #[error("Could not resolve a product identifier from: {0}")]
    UnresolvedIdentifier(String),

    #[error("Invalid target rating {0}: must be below 5")]
    InvalidTarget(f64),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rendering {url} timed out after {after:?}")]
    RenderTimeout { url: String, after: Duration },

    #[error("Rendering {url} failed: {reason}")]
    RenderFailure { url: String, reason: String },

    #[error("Invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    #[error("Batch of {len} requests exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RatecastError {
    /// Stable machine-readable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            RatecastError::UnresolvedIdentifier(_) => "unresolved_identifier",
            RatecastError::InvalidTarget(_) => "invalid_target",
            RatecastError::InvalidRequest(_) => "invalid_request",
            RatecastError::RenderTimeout { .. } => "render_timeout",
            RatecastError::RenderFailure { .. } => "render_failure",
            RatecastError::Selector { .. } => "selector",
            RatecastError::BatchTooLarge { .. } => "batch_too_large",
            RatecastError::Database(_) => "database",
            RatecastError::Serialization(_) => "serialization",
            RatecastError::Io(_) => "io",
            RatecastError::Csv(_) => "csv",
            RatecastError::Pattern(_) => "pattern",
            RatecastError::Config(_) => "config",
        }
    }

    pub(crate) fn render_failure(url: &str, reason: impl std::fmt::Display) -> Self {
        RatecastError::RenderFailure {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RatecastError>;
