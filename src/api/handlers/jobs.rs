//! Job status and control request handlers.
//!
//! The thin HTTP surface over the scheduler and the execution history
//! store: status, manual trigger/stop/resume, history, and stats.

use axum::{
    Json,
    extract::{Path, State},
};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::JOB_TAG;
use crate::api::dto::{
    HistoryQuery, JobExecutionResponse, JobInfoResponse, JobStatusResponse, MessageResponse,
    PagedResponse, StatsQuery,
};
use crate::error::{AppError, AppResult};
use crate::jobs::types::{JobKind, JobStatus};
use crate::repositories::JobStats;
use crate::state::AppState;
use crate::utils::validate::ValidatedQuery;

/// Creates job-related routes.
pub fn job_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_jobs))
        .routes(routes!(job_status))
        .routes(routes!(trigger_job))
        .routes(routes!(stop_job))
        .routes(routes!(resume_job))
        .routes(routes!(list_executions))
        .routes(routes!(job_stats))
}

fn parse_job(name: &str) -> AppResult<JobKind> {
    JobKind::from_job_name(name).ok_or_else(|| AppError::NotFound {
        entity: "Job".to_string(),
        field: "name".to_string(),
        value: name.to_string(),
    })
}

/// GET /api/jobs - List all registered jobs with trigger/pause metadata
#[utoipa::path(
    get,
    path = "/",
    tag = JOB_TAG,
    responses(
        (status = 200, description = "Registered jobs", body = Vec<JobInfoResponse>)
    )
)]
async fn list_jobs(State(state): State<AppState>) -> AppResult<Json<Vec<JobInfoResponse>>> {
    let jobs = state.services.jobs.list().await;
    Ok(Json(jobs.into_iter().map(JobInfoResponse::from).collect()))
}

/// GET /api/jobs/:job_name/status - Current status of one job
#[utoipa::path(
    get,
    path = "/{job_name}/status",
    tag = JOB_TAG,
    params(
        ("job_name" = String, Path, description = "Job name", example = "data_collector")
    ),
    responses(
        (status = 200, description = "Job status", body = JobStatusResponse),
        (status = 404, description = "Unknown job name")
    )
)]
async fn job_status(
    State(state): State<AppState>,
    Path(job_name): Path<String>,
) -> AppResult<Json<JobStatusResponse>> {
    let kind = parse_job(&job_name)?;
    let summary = state.services.jobs.status(kind).await?;
    Ok(Json(JobStatusResponse::from(summary)))
}

/// POST /api/jobs/:job_name/trigger - Manually run one tick of a job
#[utoipa::path(
    post,
    path = "/{job_name}/trigger",
    tag = JOB_TAG,
    params(
        ("job_name" = String, Path, description = "Job name")
    ),
    responses(
        (status = 202, description = "Job execution triggered", body = MessageResponse),
        (status = 404, description = "Unknown job name"),
        (status = 422, description = "Job scheduling is disabled")
    )
)]
async fn trigger_job(
    State(state): State<AppState>,
    Path(job_name): Path<String>,
) -> AppResult<(axum::http::StatusCode, Json<MessageResponse>)> {
    let kind = parse_job(&job_name)?;
    state.services.jobs.trigger(kind).await?;
    Ok((
        axum::http::StatusCode::ACCEPTED,
        Json(MessageResponse::new("Job execution triggered")),
    ))
}

/// POST /api/jobs/:job_name/stop - Manually stop (pause) a job
#[utoipa::path(
    post,
    path = "/{job_name}/stop",
    tag = JOB_TAG,
    params(
        ("job_name" = String, Path, description = "Job name")
    ),
    responses(
        (status = 200, description = "Job stopped", body = MessageResponse),
        (status = 404, description = "Unknown job name"),
        (status = 422, description = "Job scheduling is disabled")
    )
)]
async fn stop_job(
    State(state): State<AppState>,
    Path(job_name): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let kind = parse_job(&job_name)?;
    state.services.jobs.stop(kind).await?;
    Ok(Json(MessageResponse::new("Job stopped")))
}

/// POST /api/jobs/:job_name/resume - Manually resume a stopped job
#[utoipa::path(
    post,
    path = "/{job_name}/resume",
    tag = JOB_TAG,
    params(
        ("job_name" = String, Path, description = "Job name")
    ),
    responses(
        (status = 200, description = "Job resumed", body = MessageResponse),
        (status = 404, description = "Unknown job name"),
        (status = 422, description = "Job scheduling is disabled")
    )
)]
async fn resume_job(
    State(state): State<AppState>,
    Path(job_name): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let kind = parse_job(&job_name)?;
    state.services.jobs.resume(kind).await?;
    Ok(Json(MessageResponse::new("Job resumed")))
}

/// GET /api/jobs/:job_name/executions - Paginated execution history
#[utoipa::path(
    get,
    path = "/{job_name}/executions",
    tag = JOB_TAG,
    params(
        ("job_name" = String, Path, description = "Job name"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Execution history page", body = PagedResponse<JobExecutionResponse>),
        (status = 400, description = "Invalid status filter"),
        (status = 404, description = "Unknown job name")
    )
)]
async fn list_executions(
    State(state): State<AppState>,
    Path(job_name): Path<String>,
    ValidatedQuery(query): ValidatedQuery<HistoryQuery>,
) -> AppResult<Json<PagedResponse<JobExecutionResponse>>> {
    let kind = parse_job(&job_name)?;
    let status_filter = query
        .status
        .as_deref()
        .map(str::parse::<JobStatus>)
        .transpose()
        .map_err(|message| AppError::BadRequest { message })?;

    let (executions, total) = state
        .services
        .jobs
        .executions(kind, query.limit(), query.offset(), status_filter)
        .await?;

    let data: Vec<JobExecutionResponse> = executions
        .into_iter()
        .map(JobExecutionResponse::from)
        .collect();

    Ok(Json(PagedResponse::new(
        data,
        query.page,
        query.page_size,
        total as u64,
    )))
}

/// GET /api/jobs/:job_name/stats - Aggregate stats over a trailing window
#[utoipa::path(
    get,
    path = "/{job_name}/stats",
    tag = JOB_TAG,
    params(
        ("job_name" = String, Path, description = "Job name"),
        StatsQuery
    ),
    responses(
        (status = 200, description = "Aggregate execution statistics", body = JobStats),
        (status = 404, description = "Unknown job name")
    )
)]
async fn job_stats(
    State(state): State<AppState>,
    Path(job_name): Path<String>,
    ValidatedQuery(query): ValidatedQuery<StatsQuery>,
) -> AppResult<Json<JobStats>> {
    let kind = parse_job(&job_name)?;
    let stats = state.services.jobs.stats(kind, query.days).await?;
    Ok(Json(stats))
}
