//! Error handler for converting AppError to HTTP responses.
//!
//! Implements IntoResponse for AppError so handlers can return
//! `AppResult<T>` directly, with consistent status mapping and without
//! leaking internal error details.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::api::dto::ErrorResponse;
use crate::error::AppError;

impl IntoResponse for AppError {
    /// # Status Code Mapping
    /// - NotFound → 404 NOT_FOUND
    /// - Duplicate → 409 CONFLICT
    /// - Validation / ValidationErrors / BadRequest → 400 BAD_REQUEST
    /// - UnprocessableContent → 422 UNPROCESSABLE_ENTITY
    /// - External → 502 BAD_GATEWAY
    /// - ConnectionPool → 503 SERVICE_UNAVAILABLE
    /// - Database / Configuration / Internal → 500 INTERNAL_SERVER_ERROR
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::NotFound {
                entity,
                field,
                value,
            } => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new(
                    "NOT_FOUND",
                    &format!("{} with {}={} not found", entity, field, value),
                ),
            ),
            AppError::Duplicate {
                entity,
                field,
                value,
            } => (
                StatusCode::CONFLICT,
                ErrorResponse::new(
                    "DUPLICATE",
                    &format!("{}.{} = '{}' already exists", entity, field, value),
                ),
            ),
            AppError::Validation { field, reason } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", reason).with_details(json!({
                    "field": field,
                })),
            ),
            AppError::ValidationErrors { errors } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", "Request validation failed").with_details(
                    json!({
                        "errors": errors
                            .iter()
                            .map(|e| json!({"field": e.field, "message": e.message}))
                            .collect::<Vec<_>>(),
                    }),
                ),
            ),
            AppError::BadRequest { message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("BAD_REQUEST", message),
            ),
            AppError::UnprocessableContent { message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse::new("UNPROCESSABLE_CONTENT", message),
            ),
            AppError::External { service, .. } => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse::new(
                    "EXTERNAL_SERVICE_ERROR",
                    &format!("External service failed: {}", service),
                ),
            ),
            AppError::Database { operation, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(
                    "DATABASE_ERROR",
                    &format!("Database operation failed: {}", operation),
                ),
            ),
            AppError::Configuration { key, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("CONFIGURATION_ERROR", &format!("Configuration error: {}", key)),
            ),
            AppError::ConnectionPool { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::new("SERVICE_UNAVAILABLE", "Database connection unavailable"),
            ),
            AppError::Internal { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("INTERNAL_ERROR", "An internal error occurred"),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, status = %status.as_u16(), "Request failed");
        }

        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = AppError::NotFound {
            entity: "Job".to_string(),
            field: "name".to_string(),
            value: "x".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_error_hides_details() {
        let response = AppError::Internal {
            source: anyhow::Error::msg("secret connection string"),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_external_maps_to_bad_gateway() {
        let response = AppError::External {
            service: "event feed".to_string(),
            source: anyhow::Error::msg("timeout"),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
