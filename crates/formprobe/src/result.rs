//! Result and error types for formprobe.

use thiserror::Error;

use crate::contract::ContractError;
use crate::scenario::ScenarioError;

/// Result type for formprobe operations
pub type FormResult<T> = Result<T, FormError>;

/// Errors that can occur while driving a form
#[derive(Debug, Error)]
pub enum FormError {
    /// A bounded wait or driver call exceeded its limit
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    Timeout {
        /// What was being waited for
        waited_for: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// The driver could not be acquired or released
    #[error("Driver unavailable: {message}")]
    DriverUnavailable {
        /// Error message
        message: String,
    },

    /// A driver operation failed
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// The target reported a field identifier the contract does not know
    #[error("Unknown field identifier '{0}'")]
    UnknownField(String),

    /// Contract construction error
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Scenario definition error
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FormError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a driver-unavailable error
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::DriverUnavailable {
            message: message.into(),
        }
    }

    /// Check if this error is a timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = FormError::Timeout {
            waited_for: "success message".to_string(),
            ms: 5000,
        };
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Timed out after 5000ms waiting for success message"
        );
    }

    #[test]
    fn test_driver_constructors() {
        assert!(FormError::driver("boom").to_string().contains("boom"));
        assert!(FormError::unavailable("no chrome")
            .to_string()
            .starts_with("Driver unavailable"));
        assert!(!FormError::driver("x").is_timeout());
    }

    #[test]
    fn test_unknown_field_message() {
        let err = FormError::UnknownField("email".to_string());
        assert_eq!(err.to_string(), "Unknown field identifier 'email'");
    }
}
