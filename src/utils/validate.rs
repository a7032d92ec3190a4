//! Validated request extractors.
//!
//! Wrap axum's Json/Query extractors and run validator's `Validate` on the
//! deserialized value, converting failures into structured AppError
//! responses.

use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// JSON body extractor that validates after deserialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> AppResult<Self> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest {
                message: rejection.to_string(),
            })?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Query string extractor that validates after deserialization.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> AppResult<Self> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::BadRequest {
                message: rejection.to_string(),
            })?;
        value.validate()?;
        Ok(ValidatedQuery(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, header};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct TestQuery {
        #[validate(range(min = 1, max = 100, message = "Page size must be between 1 and 100"))]
        page_size: u32,
    }

    #[derive(Debug, Deserialize, Validate)]
    struct TestBody {
        #[validate(length(min = 1, message = "Title is required"))]
        title: String,
    }

    async fn extract_query(uri: &str) -> AppResult<ValidatedQuery<TestQuery>> {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (mut parts, _) = request.into_parts();
        ValidatedQuery::<TestQuery>::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_valid_query() {
        let result = extract_query("/jobs?page_size=20").await;
        let ValidatedQuery(query) = result.expect("should extract");
        assert_eq!(query.page_size, 20);
    }

    #[tokio::test]
    async fn test_query_validation_failure() {
        let result = extract_query("/jobs?page_size=500").await;
        match result.unwrap_err() {
            AppError::ValidationErrors { errors } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "page_size");
                assert!(errors[0].message.contains("between 1 and 100"));
            }
            other => panic!("Expected ValidationErrors, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_deserialization_failure() {
        let result = extract_query("/jobs?page_size=abc").await;
        assert!(matches!(result, Err(AppError::BadRequest { .. })));
    }

    #[tokio::test]
    async fn test_valid_json_body() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/test")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"title": "AI Conference"}"#))
            .unwrap();

        let result = ValidatedJson::<TestBody>::from_request(request, &()).await;
        let ValidatedJson(body) = result.expect("should extract");
        assert_eq!(body.title, "AI Conference");
    }

    #[tokio::test]
    async fn test_json_validation_failure() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/test")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"title": ""}"#))
            .unwrap();

        let result = ValidatedJson::<TestBody>::from_request(request, &()).await;
        match result.unwrap_err() {
            AppError::ValidationErrors { errors } => {
                assert_eq!(errors[0].field, "title");
            }
            other => panic!("Expected ValidationErrors, got {:?}", other),
        }
    }
}
