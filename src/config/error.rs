//! Configuration error types

use thiserror::Error;

/// Errors produced while locating, parsing, or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required configuration file is missing
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Configuration content could not be deserialized
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// A loaded value failed cross-field validation
    #[error("Validation error: {field} - {message}")]
    ValidationError { field: String, message: String },

    /// A controlling environment variable holds an unusable value
    #[error("Environment variable error: {0}")]
    EnvVarError(String),

    /// Two mutually exclusive configuration sources were both set
    #[error("Mutual exclusivity error: {0}")]
    MutualExclusivityError(String),

    /// Error bubbled up from the config crate itself
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

impl ConfigError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        ConfigError::FileNotFound(path.into())
    }

    pub fn mutual_exclusivity(message: impl Into<String>) -> Self {
        ConfigError::MutualExclusivityError(message.into())
    }
}
