//! Error types for retry configuration
//!
//! Only configuration steps can fail. Failures of the wrapped operation are
//! handled inside the retry loop and never surface as this type.

use thiserror::Error;

/// Result type alias for configuration steps that can fail.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for insistent.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A builder setter, strategy constructor or `build()` was given values
    /// that violate the configuration invariants.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An environment variable was present but could not be read, parsed or
    /// applied to the selected strategy.
    #[error("Invalid value for {var}: '{value}'")]
    Environment {
        /// Name of the offending variable
        var: String,
        /// Raw value found in the environment
        value: String,
    },

    /// Serialized settings could not be decoded.
    #[error("Invalid settings: {0}")]
    Settings(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidConfiguration`].
    pub fn invalid(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::debug!(reason = %message, "rejected retry configuration");
        Error::InvalidConfiguration(message)
    }

    /// Returns true if this is an [`Error::InvalidConfiguration`].
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, Error::InvalidConfiguration(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Settings(err.to_string())
    }
}
