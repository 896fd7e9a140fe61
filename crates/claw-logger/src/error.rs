//! Error types for the logger.

use thiserror::Error;

/// Errors that can occur in the logger.
#[derive(Debug, Error)]
pub enum LogError {
    /// A configuration value was outside its accepted range.
    #[error("invalid {field}: {reason}")]
    InvalidConfig {
        /// Name of the rejected setting.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A level name could not be parsed.
    #[error("unknown log level: {0}")]
    InvalidLevel(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The logger has been shut down.
    #[error("logger is shut down")]
    Closed,
}

impl LogError {
    /// Builds an [`LogError::InvalidConfig`] for a value that must be at least one.
    pub(crate) fn below_one(field: &'static str) -> Self {
        Self::InvalidConfig {
            field,
            reason: "must be at least 1".to_string(),
        }
    }
}

/// Result type alias for logger operations.
pub type Result<T> = std::result::Result<T, LogError>;
