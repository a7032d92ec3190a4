use crate::error::DatabaseErrorConverter;
use thiserror::Error;

/// A single field-level validation failure, used when request validation
/// produces several errors at once.
#[derive(Debug, Clone)]
pub struct ValidationFieldError {
    pub field: String,
    pub message: String,
}

/// Application-wide error type that represents all possible errors in the system.
///
/// This enum provides structured error handling across repositories, services,
/// the job core, and the API layer, with automatic conversion from anyhow and
/// diesel errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found error with entity, field, and value information
    #[error("Resource not found: {entity} with {field}={value}")]
    NotFound {
        entity: String,
        field: String,
        value: String,
    },

    /// Duplicate entry error for unique constraint violations
    #[error("Duplicate entry: {entity}.{field} = '{value}' already exists")]
    Duplicate {
        entity: String,
        field: String,
        value: String,
    },

    /// Validation error with field-specific details
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors collected from request validation
    #[error("Validation failed for {} field(s)", errors.len())]
    ValidationErrors { errors: Vec<ValidationFieldError> },

    /// Bad request error with descriptive message
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Unprocessable content error with descriptive message
    #[error("Unprocessable content: {message}")]
    UnprocessableContent { message: String },

    /// External dependency error (event feed, SMTP, webhook endpoint)
    #[error("External service error: {service}")]
    External {
        service: String,
        #[source]
        source: anyhow::Error,
    },

    /// Database operation error with operation context
    #[error("Database operation failed: {operation}")]
    Database {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// Configuration error with key information
    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Connection pool error
    #[error("Connection pool error")]
    ConnectionPool {
        #[source]
        source: anyhow::Error,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(error: diesel::result::Error) -> Self {
        DatabaseErrorConverter::convert_diesel_error(error, "database operation")
    }
}

impl From<crate::config::error::ConfigError> for AppError {
    fn from(error: crate::config::error::ConfigError) -> Self {
        AppError::Configuration {
            key: "settings".to_string(),
            source: anyhow::Error::from(error),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let errors = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ValidationFieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field)),
                })
            })
            .collect();
        AppError::ValidationErrors { errors }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = AppError::NotFound {
            entity: "Job".to_string(),
            field: "name".to_string(),
            value: "data_collector".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Resource not found: Job with name=data_collector"
        );
    }

    #[test]
    fn test_validation_errors_from_validator() {
        use validator::Validate;

        #[derive(Validate)]
        struct Form {
            #[validate(length(min = 1, message = "Destination address is required"))]
            destination_address: String,
        }

        let form = Form {
            destination_address: String::new(),
        };
        let err: AppError = form.validate().unwrap_err().into();
        match err {
            AppError::ValidationErrors { errors } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "destination_address");
                assert!(errors[0].message.contains("required"));
            }
            other => panic!("Expected ValidationErrors, got {:?}", other),
        }
    }

    #[test]
    fn test_diesel_not_found_conversion() {
        let err: AppError = diesel::result::Error::NotFound.into();
        assert!(matches!(err, AppError::NotFound { .. }));
    }
}
