use async_trait::async_trait;
use chrono::{Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_async::pooled_connection::bb8::PooledConnection;
use serde::Serialize;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::jobs::history::ExecutionHistory;
use crate::jobs::models::{JobExecution, NewJobExecution, UpdateJobExecution};
use crate::jobs::types::{JobKind, JobStatus};
use crate::schema::job_execution_history;

/// Bound on the consecutive-failure scan; only this many of the most recent
/// records are ever inspected.
const CONSECUTIVE_SCAN_LIMIT: i64 = 10;

/// Aggregate statistics over a trailing window, success/failure runs only.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct JobStats {
    pub total_executions: i64,
    pub successful_executions: i64,
    pub failed_executions: i64,
    /// Percentage with one decimal place
    pub success_rate: f64,
    /// Mean duration of successful runs, seconds
    pub average_duration_seconds: f64,
    /// Error messages of the most recent failures, newest first
    pub recent_failure_reasons: Vec<String>,
}

/// Persistence for job execution history. The single owner of
/// `job_execution_history` rows.
#[derive(Clone)]
pub struct JobExecutionRepository {
    pool: AsyncDbPool,
}

impl JobExecutionRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> AppResult<PooledConnection<'_, diesel_async::AsyncPgConnection>> {
        self.pool.get().await.map_err(|e| AppError::ConnectionPool {
            source: anyhow::Error::from(e),
        })
    }

    /// Paginated history for one job, newest first, with an optional status
    /// filter. Returns the page and the total row count for the filter.
    pub async fn list_by_job(
        &self,
        kind: JobKind,
        limit: i64,
        offset: i64,
        status_filter: Option<JobStatus>,
    ) -> AppResult<(Vec<JobExecution>, i64)> {
        let mut conn = self.conn().await?;

        let mut query = job_execution_history::table
            .filter(job_execution_history::job_name.eq(kind.job_name()))
            .select(JobExecution::as_select())
            .into_boxed();
        let mut count_query = job_execution_history::table
            .filter(job_execution_history::job_name.eq(kind.job_name()))
            .count()
            .into_boxed();

        if let Some(status) = status_filter {
            query = query.filter(job_execution_history::status.eq(status));
            count_query = count_query.filter(job_execution_history::status.eq(status));
        }

        let records = query
            .order((
                job_execution_history::created_at.desc(),
                job_execution_history::id.desc(),
            ))
            .limit(limit)
            .offset(offset)
            .load(&mut conn)
            .await
            .map_err(AppError::from)?;

        let total = count_query
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)?;

        Ok((records, total))
    }

    /// Aggregates over the trailing window. Only `success`/`failed` records
    /// count; `running` and marker events stay out of the denominator.
    pub async fn stats(&self, kind: JobKind, window_days: i64) -> AppResult<JobStats> {
        let mut conn = self.conn().await?;
        let window_start = Utc::now().naive_utc() - Duration::days(window_days);

        let executions: Vec<JobExecution> = job_execution_history::table
            .filter(job_execution_history::job_name.eq(kind.job_name()))
            .filter(job_execution_history::created_at.ge(window_start))
            .filter(
                job_execution_history::status
                    .eq(JobStatus::Success)
                    .or(job_execution_history::status.eq(JobStatus::Failed)),
            )
            .order((
                job_execution_history::created_at.desc(),
                job_execution_history::id.desc(),
            ))
            .select(JobExecution::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)?;

        Ok(compute_stats(&executions))
    }
}

/// Pure aggregation over an already-filtered window, newest first.
fn compute_stats(executions: &[JobExecution]) -> JobStats {
    let total = executions.len() as i64;
    let successful = executions
        .iter()
        .filter(|e| e.status == JobStatus::Success)
        .count() as i64;
    let failed = total - successful;

    let success_rate = if total > 0 {
        (successful as f64 / total as f64 * 1000.0).round() / 10.0
    } else {
        0.0
    };

    let durations: Vec<i32> = executions
        .iter()
        .filter(|e| e.status == JobStatus::Success)
        .filter_map(|e| e.duration_seconds)
        .collect();
    let average_duration_seconds = if durations.is_empty() {
        0.0
    } else {
        let mean = durations.iter().map(|d| *d as f64).sum::<f64>() / durations.len() as f64;
        (mean * 10.0).round() / 10.0
    };

    let recent_failure_reasons = executions
        .iter()
        .filter(|e| e.status == JobStatus::Failed)
        .filter_map(|e| e.error_message.clone())
        .take(3)
        .collect();

    JobStats {
        total_executions: total,
        successful_executions: successful,
        failed_executions: failed,
        success_rate,
        average_duration_seconds,
        recent_failure_reasons,
    }
}

#[async_trait]
impl ExecutionHistory for JobExecutionRepository {
    async fn create(&self, new: NewJobExecution) -> AppResult<JobExecution> {
        let mut conn = self.conn().await?;

        diesel::insert_into(job_execution_history::table)
            .values(&new)
            .returning(JobExecution::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }

    async fn update(&self, id: i64, changes: UpdateJobExecution) -> AppResult<JobExecution> {
        let mut conn = self.conn().await?;

        diesel::update(job_execution_history::table.find(id))
            .set(&changes)
            .returning(JobExecution::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::NotFound => AppError::NotFound {
                    entity: "JobExecution".to_string(),
                    field: "id".to_string(),
                    value: id.to_string(),
                },
                _ => AppError::from(e),
            })
    }

    async fn latest(&self, kind: JobKind) -> AppResult<Option<JobExecution>> {
        let mut conn = self.conn().await?;

        job_execution_history::table
            .filter(job_execution_history::job_name.eq(kind.job_name()))
            .order((
                job_execution_history::created_at.desc(),
                job_execution_history::id.desc(),
            ))
            .select(JobExecution::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }

    async fn consecutive_failures(&self, kind: JobKind) -> AppResult<u32> {
        let mut conn = self.conn().await?;

        let recent: Vec<JobStatus> = job_execution_history::table
            .filter(job_execution_history::job_name.eq(kind.job_name()))
            .order((
                job_execution_history::created_at.desc(),
                job_execution_history::id.desc(),
            ))
            .limit(CONSECUTIVE_SCAN_LIMIT)
            .select(job_execution_history::status)
            .load(&mut conn)
            .await
            .map_err(AppError::from)?;

        let mut count = 0;
        for status in recent {
            if status == JobStatus::Failed {
                count += 1;
            } else {
                break;
            }
        }
        Ok(count)
    }

    async fn cleanup(&self, kind: JobKind, retention_days: i64) -> AppResult<usize> {
        let mut conn = self.conn().await?;
        let cutoff = Utc::now().naive_utc() - Duration::days(retention_days);

        diesel::delete(
            job_execution_history::table.filter(
                job_execution_history::job_name
                    .eq(kind.job_name())
                    .and(job_execution_history::created_at.lt(cutoff))
                    .and(job_execution_history::status.ne(JobStatus::Running)),
            ),
        )
        .execute(&mut conn)
        .await
        .map_err(AppError::from)
    }

    async fn sweep_orphaned_running(&self) -> AppResult<usize> {
        let mut conn = self.conn().await?;

        diesel::update(
            job_execution_history::table
                .filter(job_execution_history::status.eq(JobStatus::Running)),
        )
        .set((
            job_execution_history::status.eq(JobStatus::Failed),
            job_execution_history::completed_at.eq(diesel::dsl::now),
            job_execution_history::error_message.eq("interrupted by process shutdown"),
        ))
        .execute(&mut conn)
        .await
        .map_err(AppError::from)
    }
}
