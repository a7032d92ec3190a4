use async_trait::async_trait;
use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::AppResult;

/// The two logical jobs this process schedules.
///
/// Used as the first-class discriminant in every execution-history query so
/// the jobs never read each other's records by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    DataCollection,
    NotificationDispatch,
}

impl JobKind {
    pub const ALL: [JobKind; 2] = [JobKind::DataCollection, JobKind::NotificationDispatch];

    /// Stable identifier stored in `job_execution_history.job_name`.
    pub fn job_name(&self) -> &'static str {
        match self {
            JobKind::DataCollection => "data_collector",
            JobKind::NotificationDispatch => "notification_dispatcher",
        }
    }

    /// Human-readable name for logs and the API.
    pub fn display_name(&self) -> &'static str {
        match self {
            JobKind::DataCollection => "Event Collector",
            JobKind::NotificationDispatch => "Notification Dispatcher",
        }
    }

    pub fn from_job_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.job_name() == name)
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.job_name())
    }
}

/// Job execution status.
///
/// `Running`, `Success` and `Failed` describe an attempt group's lifecycle;
/// `Paused` and `Resumed` are standalone marker records written by the
/// circuit breaker and the scheduler.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema, DbEnum,
)]
#[db_enum(existing_type_path = "crate::schema::sql_types::JobStatus")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Success,
    Failed,
    Paused,
    Resumed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Running => write!(f, "running"),
            JobStatus::Success => write!(f, "success"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Paused => write!(f, "paused"),
            JobStatus::Resumed => write!(f, "resumed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "running" => Ok(JobStatus::Running),
            "success" => Ok(JobStatus::Success),
            "failed" => Ok(JobStatus::Failed),
            "paused" => Ok(JobStatus::Paused),
            "resumed" => Ok(JobStatus::Resumed),
            other => Err(format!(
                "Unknown job status '{}'. Valid values are: running, success, failed, paused, resumed",
                other
            )),
        }
    }
}

/// Result of one successful job body run.
#[derive(Debug, Clone, Default)]
pub struct JobOutcome {
    /// Items the job looked at (events scraped, subscriptions processed)
    pub items_scanned: i32,
    /// Items the job produced (events saved, notifications sent)
    pub items_new: i32,
    /// Full structured result stored in the execution record
    pub payload: JsonValue,
}

/// Trait that all job bodies implement.
///
/// A task is invoked once per attempt inside the retry ladder; it must not
/// retry internally.
#[async_trait]
pub trait JobTask: Send + Sync {
    /// Which logical job this task is the body of
    fn kind(&self) -> JobKind;

    /// Execute one attempt
    async fn run(&self) -> AppResult<JobOutcome>;
}

/// Best-effort sink for terminal-failure and pause alerts.
///
/// Implementations must swallow their own errors; the job core treats this
/// call as fire-and-forget.
#[async_trait]
pub trait FailureNotifier: Send + Sync {
    async fn notify(&self, kind: JobKind, error_message: &str, retry_count: u32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_name_round_trip() {
        for kind in JobKind::ALL {
            assert_eq!(JobKind::from_job_name(kind.job_name()), Some(kind));
        }
        assert_eq!(JobKind::from_job_name("unknown_job"), None);
    }

    #[test]
    fn test_job_status_from_str() {
        assert_eq!("failed".parse::<JobStatus>().unwrap(), JobStatus::Failed);
        assert_eq!("PAUSED".parse::<JobStatus>().unwrap(), JobStatus::Paused);
        assert!("done".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_job_status_display_matches_serde() {
        let json = serde_json::to_string(&JobStatus::Resumed).unwrap();
        assert_eq!(json, format!("\"{}\"", JobStatus::Resumed));
    }
}
