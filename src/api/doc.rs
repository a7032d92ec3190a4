use utoipa::OpenApi;

pub const HEALTH_TAG: &str = "Health";
pub const JOB_TAG: &str = "Jobs";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clubwatch",
        description = "Event monitoring and keyword notification backend",
    ),
    components(
        schemas(
            crate::api::dto::ErrorResponse,
        )
    ),
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = JOB_TAG, description = "Background job status and control endpoints"),
    )
)]
pub struct ApiDoc;
