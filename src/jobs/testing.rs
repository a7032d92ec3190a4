//! In-memory fakes for exercising the job core without a database or a
//! real clock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};
use crate::jobs::breaker::PauseControl;
use crate::jobs::executor::Sleeper;
use crate::jobs::history::ExecutionHistory;
use crate::jobs::models::{JobExecution, NewJobExecution, UpdateJobExecution};
use crate::jobs::types::{FailureNotifier, JobKind, JobOutcome, JobStatus, JobTask};

/// Execution history backed by a Vec; insertion order is recency order.
pub(crate) struct MemoryHistory {
    records: Mutex<Vec<JobExecution>>,
    next_id: Mutex<i64>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            next_id: Mutex::new(1),
        }
    }

    pub async fn records_for(&self, kind: JobKind) -> Vec<JobExecution> {
        self.records
            .lock()
            .await
            .iter()
            .filter(|r| r.job_name == kind.job_name())
            .cloned()
            .collect()
    }

    /// Appends a terminal record directly, bypassing create/update.
    pub async fn push_terminal(&self, kind: JobKind, status: JobStatus) {
        let new = match status {
            JobStatus::Paused | JobStatus::Resumed => {
                NewJobExecution::marker(kind, status, "test marker")
            }
            _ => {
                let mut record = NewJobExecution::running(kind);
                record.status = status;
                record.completed_at = Some(record.started_at);
                record
            }
        };
        let _ = self.create(new).await;
    }
}

#[async_trait]
impl ExecutionHistory for MemoryHistory {
    async fn create(&self, new: NewJobExecution) -> AppResult<JobExecution> {
        let mut next_id = self.next_id.lock().await;
        let id = *next_id;
        *next_id += 1;

        let record = JobExecution {
            id,
            job_name: new.job_name,
            status: new.status,
            started_at: new.started_at,
            completed_at: new.completed_at,
            duration_seconds: None,
            items_scanned: None,
            items_new: None,
            result_payload: None,
            error_message: new.error_message,
            retry_count: new.retry_count,
            created_at: Utc::now().naive_utc(),
        };
        self.records.lock().await.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: i64, changes: UpdateJobExecution) -> AppResult<JobExecution> {
        let mut records = self.records.lock().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound {
                entity: "JobExecution".to_string(),
                field: "id".to_string(),
                value: id.to_string(),
            })?;

        if let Some(status) = changes.status {
            record.status = status;
        }
        if let Some(completed_at) = changes.completed_at {
            record.completed_at = Some(completed_at);
        }
        if let Some(duration) = changes.duration_seconds {
            record.duration_seconds = Some(duration);
        }
        if let Some(scanned) = changes.items_scanned {
            record.items_scanned = Some(scanned);
        }
        if let Some(new_items) = changes.items_new {
            record.items_new = Some(new_items);
        }
        if let Some(payload) = changes.result_payload {
            record.result_payload = Some(payload);
        }
        if let Some(error) = changes.error_message {
            record.error_message = Some(error);
        }
        if let Some(retry_count) = changes.retry_count {
            record.retry_count = retry_count;
        }
        Ok(record.clone())
    }

    async fn latest(&self, kind: JobKind) -> AppResult<Option<JobExecution>> {
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .rev()
            .find(|r| r.job_name == kind.job_name())
            .cloned())
    }

    async fn consecutive_failures(&self, kind: JobKind) -> AppResult<u32> {
        let records = self.records.lock().await;
        let mut count = 0;
        for record in records
            .iter()
            .rev()
            .filter(|r| r.job_name == kind.job_name())
            .take(10)
        {
            if record.status == JobStatus::Failed {
                count += 1;
            } else {
                break;
            }
        }
        Ok(count)
    }

    async fn cleanup(&self, kind: JobKind, retention_days: i64) -> AppResult<usize> {
        let cutoff = Utc::now().naive_utc() - chrono::Duration::days(retention_days);
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| r.job_name != kind.job_name() || r.created_at >= cutoff);
        Ok(before - records.len())
    }

    async fn sweep_orphaned_running(&self) -> AppResult<usize> {
        let mut records = self.records.lock().await;
        let mut swept = 0;
        for record in records.iter_mut() {
            if record.status == JobStatus::Running {
                record.status = JobStatus::Failed;
                record.error_message = Some("interrupted by process shutdown".to_string());
                swept += 1;
            }
        }
        Ok(swept)
    }
}

/// Sleeper that records requested durations and returns immediately.
pub(crate) struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self {
            slept: Mutex::new(Vec::new()),
        }
    }

    pub async fn slept(&self) -> Vec<Duration> {
        self.slept.lock().await.clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().await.push(duration);
    }
}

/// Failure notifier that records alerts instead of sending them.
pub(crate) struct MemoryFailureNotifier {
    alerts: Mutex<Vec<(JobKind, String, u32)>>,
}

impl MemoryFailureNotifier {
    pub fn new() -> Self {
        Self {
            alerts: Mutex::new(Vec::new()),
        }
    }

    pub async fn alerts(&self) -> Vec<(JobKind, String, u32)> {
        self.alerts.lock().await.clone()
    }
}

#[async_trait]
impl FailureNotifier for MemoryFailureNotifier {
    async fn notify(&self, kind: JobKind, error_message: &str, retry_count: u32) {
        self.alerts
            .lock()
            .await
            .push((kind, error_message.to_string(), retry_count));
    }
}

/// Pause control that records pause/resume-scheduling calls.
pub(crate) struct MemoryPauseControl {
    pub paused: Mutex<Vec<JobKind>>,
    pub resumes: Mutex<Vec<(JobKind, Duration)>>,
}

impl MemoryPauseControl {
    pub fn new() -> Self {
        Self {
            paused: Mutex::new(Vec::new()),
            resumes: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PauseControl for MemoryPauseControl {
    async fn pause(&self, kind: JobKind) -> AppResult<()> {
        self.paused.lock().await.push(kind);
        Ok(())
    }

    async fn schedule_resume(&self, kind: JobKind, delay: Duration) -> AppResult<()> {
        self.resumes.lock().await.push((kind, delay));
        Ok(())
    }
}

/// Configurable job body: fails a fixed number of times, then succeeds.
pub(crate) struct StaticTask {
    kind: JobKind,
    failures_remaining: AtomicU32,
    error_message: String,
    items_scanned: i32,
    items_new: i32,
}

impl StaticTask {
    pub fn succeeding(kind: JobKind) -> Self {
        Self {
            kind,
            failures_remaining: AtomicU32::new(0),
            error_message: String::new(),
            items_scanned: 0,
            items_new: 0,
        }
    }

    pub fn failing_times(kind: JobKind, failures: u32) -> Self {
        Self {
            kind,
            failures_remaining: AtomicU32::new(failures),
            error_message: "transient failure".to_string(),
            items_scanned: 0,
            items_new: 0,
        }
    }

    pub fn always_failing(kind: JobKind, message: &str) -> Self {
        Self {
            kind,
            failures_remaining: AtomicU32::new(u32::MAX),
            error_message: message.to_string(),
            items_scanned: 0,
            items_new: 0,
        }
    }

    pub fn with_counts(mut self, items_scanned: i32, items_new: i32) -> Self {
        self.items_scanned = items_scanned;
        self.items_new = items_new;
        self
    }
}

#[async_trait]
impl JobTask for StaticTask {
    fn kind(&self) -> JobKind {
        self.kind
    }

    async fn run(&self) -> AppResult<JobOutcome> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != u32::MAX {
                self.failures_remaining.store(remaining - 1, Ordering::SeqCst);
            }
            return Err(AppError::External {
                service: "test".to_string(),
                source: anyhow::Error::msg(self.error_message.clone()),
            });
        }
        Ok(JobOutcome {
            items_scanned: self.items_scanned,
            items_new: self.items_new,
            payload: serde_json::json!({
                "items_scanned": self.items_scanned,
                "items_new": self.items_new,
            }),
        })
    }
}

// The store semantics below are shared with the production repository; the
// in-memory implementation mirrors its scan, retention, and sweep policies.
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_consecutive_failures_stops_at_first_non_failed() {
        let history = MemoryHistory::new();
        history
            .push_terminal(JobKind::DataCollection, JobStatus::Failed)
            .await;
        history
            .push_terminal(JobKind::DataCollection, JobStatus::Success)
            .await;
        history
            .push_terminal(JobKind::DataCollection, JobStatus::Failed)
            .await;
        history
            .push_terminal(JobKind::DataCollection, JobStatus::Failed)
            .await;

        // Two failures on top, then the success halts the scan; the older
        // failure beneath it is not counted.
        assert_eq!(
            history
                .consecutive_failures(JobKind::DataCollection)
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_consecutive_failures_zero_when_paused_marker_on_top() {
        let history = MemoryHistory::new();
        for _ in 0..3 {
            history
                .push_terminal(JobKind::DataCollection, JobStatus::Failed)
                .await;
        }
        history
            .push_terminal(JobKind::DataCollection, JobStatus::Paused)
            .await;

        // The marker is not `failed`, so the scan halts immediately even
        // though three failures sit right beneath it.
        assert_eq!(
            history
                .consecutive_failures(JobKind::DataCollection)
                .await
                .unwrap(),
            0
        );
        assert!(history.is_paused(JobKind::DataCollection).await.unwrap());
    }

    #[tokio::test]
    async fn test_cleanup_respects_retention_boundary() {
        let history = MemoryHistory::new();
        for _ in 0..3 {
            history
                .push_terminal(JobKind::DataCollection, JobStatus::Success)
                .await;
        }
        {
            // Backdate: one record well past retention, one exactly on the
            // boundary's near side, one current.
            let mut records = history.records.lock().await;
            let now = Utc::now().naive_utc();
            records[0].created_at = now - chrono::Duration::days(120);
            records[1].created_at = now - chrono::Duration::days(89);
        }

        let deleted = history.cleanup(JobKind::DataCollection, 90).await.unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(history.records_for(JobKind::DataCollection).await.len(), 2);
    }

    #[tokio::test]
    async fn test_sweep_orphaned_running_marks_failed() {
        let history = MemoryHistory::new();
        let orphan = history
            .create(NewJobExecution::running(JobKind::DataCollection))
            .await
            .unwrap();
        history
            .push_terminal(JobKind::NotificationDispatch, JobStatus::Success)
            .await;

        let swept = history.sweep_orphaned_running().await.unwrap();

        assert_eq!(swept, 1);
        let records = history.records_for(JobKind::DataCollection).await;
        let swept_record = records.iter().find(|r| r.id == orphan.id).unwrap();
        assert_eq!(swept_record.status, JobStatus::Failed);
        assert_eq!(
            swept_record.error_message.as_deref(),
            Some("interrupted by process shutdown")
        );
    }
}
