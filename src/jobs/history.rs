use async_trait::async_trait;

use crate::error::AppResult;
use crate::jobs::models::{JobExecution, NewJobExecution, UpdateJobExecution};
use crate::jobs::types::{JobKind, JobStatus};

/// Persistence seam for job execution history.
///
/// The retry executor and circuit breaker talk to history through this
/// trait; `JobExecutionRepository` is the production implementation and
/// tests substitute an in-memory store.
#[async_trait]
pub trait ExecutionHistory: Send + Sync {
    /// Inserts a new record and returns the persisted row.
    async fn create(&self, new: NewJobExecution) -> AppResult<JobExecution>;

    /// Applies a partial update and returns the re-read persisted row.
    async fn update(&self, id: i64, changes: UpdateJobExecution) -> AppResult<JobExecution>;

    /// The most recent record for a job, by creation time.
    async fn latest(&self, kind: JobKind) -> AppResult<Option<JobExecution>>;

    /// Counts `failed` records from the most recent record backwards,
    /// stopping at the first non-`failed` status. The scan is bounded to the
    /// 10 most recent records to cap its cost.
    async fn consecutive_failures(&self, kind: JobKind) -> AppResult<u32>;

    /// Deletes records older than the retention cutoff; returns the number
    /// deleted. Destructive and irreversible.
    async fn cleanup(&self, kind: JobKind, retention_days: i64) -> AppResult<usize>;

    /// Marks every leftover `running` record as `failed`. Called once at
    /// scheduler startup to reconcile records orphaned by an unclean
    /// shutdown.
    async fn sweep_orphaned_running(&self) -> AppResult<usize>;

    /// True iff the latest record's status is `paused`.
    async fn is_paused(&self, kind: JobKind) -> AppResult<bool> {
        Ok(self
            .latest(kind)
            .await?
            .is_some_and(|record| record.status == JobStatus::Paused))
    }
}
