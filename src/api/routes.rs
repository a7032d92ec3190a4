//! Router configuration for the API.
//!
//! Centralized route registration, OpenAPI document assembly, and
//! middleware configuration.

use axum::{Router, middleware};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::doc::ApiDoc;
use crate::api::handlers;
use crate::api::middleware::{logging_middleware, request_id_middleware};
use crate::state::AppState;

/// Creates the main application router with all routes and middleware.
///
/// # Routes
/// - `/api/jobs` - Job status and control endpoints
/// - `/health`, `/health/ready`, `/health/live` - Health probes
/// - `/swagger-ui` - Interactive API documentation
pub fn create_router(state: AppState) -> Router {
    let (api_router, api_doc) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api/jobs", handlers::jobs::job_routes())
        .split_for_parts();

    api_router
        .merge(handlers::health::health_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api_doc))
        // Middleware is applied in reverse order - last added runs first,
        // so request_id runs before logging.
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .with_state(state)
}
