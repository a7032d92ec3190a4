use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::jobs::types::{JobKind, JobStatus};
use crate::schema::job_execution_history;

/// One row of execution history: an attempt group (a whole tick including
/// its retries), or a standalone `paused`/`resumed` marker event.
#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = job_execution_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JobExecution {
    pub id: i64,
    pub job_name: String,
    pub status: JobStatus,
    pub started_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub duration_seconds: Option<i32>,
    pub items_scanned: Option<i32>,
    pub items_new: Option<i32>,
    pub result_payload: Option<JsonValue>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = job_execution_history)]
pub struct NewJobExecution {
    pub job_name: String,
    pub status: JobStatus,
    pub started_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub error_message: Option<String>,
    pub retry_count: i32,
}

impl NewJobExecution {
    /// A fresh `running` record created at the start of a tick.
    pub fn running(kind: JobKind) -> Self {
        Self {
            job_name: kind.job_name().to_string(),
            status: JobStatus::Running,
            started_at: Utc::now().naive_utc(),
            completed_at: None,
            error_message: None,
            retry_count: 0,
        }
    }

    /// A standalone marker event (`paused`/`resumed`). Markers have
    /// `started_at == completed_at` and no retry semantics.
    pub fn marker(kind: JobKind, status: JobStatus, message: &str) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            job_name: kind.job_name().to_string(),
            status,
            started_at: now,
            completed_at: Some(now),
            error_message: Some(message.to_string()),
            retry_count: 0,
        }
    }
}

/// Partial update applied when an attempt group reaches its terminal state.
/// Only the supplied fields are written.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = job_execution_history)]
pub struct UpdateJobExecution {
    pub status: Option<JobStatus>,
    pub completed_at: Option<NaiveDateTime>,
    pub duration_seconds: Option<i32>,
    pub items_scanned: Option<i32>,
    pub items_new: Option<i32>,
    pub result_payload: Option<JsonValue>,
    pub error_message: Option<String>,
    pub retry_count: Option<i32>,
}

impl UpdateJobExecution {
    /// Terminal `success` update with counters extracted from the outcome.
    pub fn success(duration_seconds: i32, outcome: &crate::jobs::types::JobOutcome, retry_count: u32) -> Self {
        Self {
            status: Some(JobStatus::Success),
            completed_at: Some(Utc::now().naive_utc()),
            duration_seconds: Some(duration_seconds),
            items_scanned: Some(outcome.items_scanned),
            items_new: Some(outcome.items_new),
            result_payload: Some(outcome.payload.clone()),
            error_message: None,
            retry_count: Some(retry_count as i32),
        }
    }

    /// Terminal `failed` update carrying the last error message.
    pub fn failed(duration_seconds: i32, error_message: String, retry_count: u32) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            completed_at: Some(Utc::now().naive_utc()),
            duration_seconds: Some(duration_seconds),
            items_scanned: None,
            items_new: None,
            result_payload: None,
            error_message: Some(error_message),
            retry_count: Some(retry_count as i32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_record_shape() {
        let new = NewJobExecution::running(JobKind::DataCollection);
        assert_eq!(new.job_name, "data_collector");
        assert_eq!(new.status, JobStatus::Running);
        assert!(new.completed_at.is_none());
        assert_eq!(new.retry_count, 0);
    }

    #[test]
    fn test_marker_record_shape() {
        let new = NewJobExecution::marker(
            JobKind::NotificationDispatch,
            JobStatus::Paused,
            "3 consecutive failures",
        );
        assert_eq!(new.job_name, "notification_dispatcher");
        assert_eq!(new.status, JobStatus::Paused);
        assert_eq!(new.completed_at, Some(new.started_at));
        assert_eq!(new.error_message.as_deref(), Some("3 consecutive failures"));
    }

    #[test]
    fn test_failed_update_keeps_counters_empty() {
        let update = UpdateJobExecution::failed(42, "boom".to_string(), 4);
        assert_eq!(update.status, Some(JobStatus::Failed));
        assert_eq!(update.duration_seconds, Some(42));
        assert!(update.items_scanned.is_none());
        assert!(update.items_new.is_none());
        assert_eq!(update.retry_count, Some(4));
    }
}
