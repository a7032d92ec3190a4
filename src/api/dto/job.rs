//! Job-related DTOs for API requests and responses.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::jobs::models::JobExecution;
use crate::jobs::scheduler::JobInfo;
use crate::jobs::types::JobStatus;
use crate::services::JobStatusSummary;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

// ============================================================================
// Request DTOs
// ============================================================================

/// Query parameters for the execution-history endpoint.
#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct HistoryQuery {
    /// Page number (1-based)
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    #[param(minimum = 1, example = 1)]
    pub page: u32,

    /// Number of items per page (max 100)
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100, message = "Page size must be between 1 and 100"))]
    #[param(minimum = 1, maximum = 100, example = 20)]
    pub page_size: u32,

    /// Optional status filter: running, success, failed, paused, resumed
    #[param(example = "failed")]
    pub status: Option<String>,
}

impl HistoryQuery {
    pub fn offset(&self) -> i64 {
        ((self.page - 1) * self.page_size) as i64
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

/// Query parameters for the stats endpoint.
#[derive(Debug, Deserialize, IntoParams, Validate)]
pub struct StatsQuery {
    /// Trailing window in days
    #[serde(default = "default_stats_days")]
    #[validate(range(min = 1, max = 90, message = "Window must be between 1 and 90 days"))]
    #[param(minimum = 1, maximum = 90, example = 7)]
    pub days: i64,
}

fn default_stats_days() -> i64 {
    7
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Simple acknowledgement body for control endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for one registered job's metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct JobInfoResponse {
    pub job_name: String,
    pub display_name: String,
    pub interval_seconds: u64,
    pub max_instances: usize,
    pub is_paused: bool,
    pub next_run_time: Option<String>,
}

impl From<JobInfo> for JobInfoResponse {
    fn from(info: JobInfo) -> Self {
        Self {
            job_name: info.job_name.to_string(),
            display_name: info.display_name.to_string(),
            interval_seconds: info.interval_seconds,
            max_instances: info.max_instances,
            is_paused: info.is_paused,
            next_run_time: info
                .next_run_time
                .map(|dt| dt.format(DATETIME_FORMAT).to_string()),
        }
    }
}

/// Response body for one execution-history record.
#[derive(Debug, Serialize, ToSchema)]
pub struct JobExecutionResponse {
    pub id: i64,
    pub job_name: String,
    pub status: JobStatus,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub duration_seconds: Option<i32>,
    pub items_scanned: Option<i32>,
    pub items_new: Option<i32>,
    #[schema(value_type = Option<Object>)]
    pub result_payload: Option<JsonValue>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub created_at: String,
}

impl From<JobExecution> for JobExecutionResponse {
    fn from(exec: JobExecution) -> Self {
        Self {
            id: exec.id,
            job_name: exec.job_name,
            status: exec.status,
            started_at: exec.started_at.format(DATETIME_FORMAT).to_string(),
            completed_at: exec
                .completed_at
                .map(|dt| dt.format(DATETIME_FORMAT).to_string()),
            duration_seconds: exec.duration_seconds,
            items_scanned: exec.items_scanned,
            items_new: exec.items_new,
            result_payload: exec.result_payload,
            error_message: exec.error_message,
            retry_count: exec.retry_count,
            created_at: exec.created_at.format(DATETIME_FORMAT).to_string(),
        }
    }
}

/// Response body for the job status endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct JobStatusResponse {
    pub job_status: String,
    pub is_paused: bool,
    pub next_run_time: Option<String>,
    pub consecutive_failures: u32,
    pub last_execution: Option<JobExecutionResponse>,
}

impl From<JobStatusSummary> for JobStatusResponse {
    fn from(summary: JobStatusSummary) -> Self {
        Self {
            job_status: summary.job_status.to_string(),
            is_paused: summary.is_paused,
            next_run_time: summary
                .next_run_time
                .map(|dt| dt.format(DATETIME_FORMAT).to_string()),
            consecutive_failures: summary.consecutive_failures,
            last_execution: summary.last_execution.map(JobExecutionResponse::from),
        }
    }
}
