//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// At least one scenario did not pass
    #[error("{failed} of {scheduled} scenarios did not pass")]
    ScenariosFailed {
        /// Failed or skipped scenarios
        failed: usize,
        /// Scenarios scheduled
        scheduled: usize,
    },

    /// `check` found the value invalid
    #[error("'{value}' is not a valid {field}")]
    Rejected {
        /// Field checked
        field: String,
        /// Value checked
        value: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Library error
    #[error("{0}")]
    Form(#[from] formprobe::FormError),

    /// Scenario file error
    #[error("Scenario error: {0}")]
    Scenario(#[from] formprobe::ScenarioError),

    /// JSON rendering error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
