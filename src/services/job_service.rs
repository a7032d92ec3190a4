//! Job service: the operational surface over the scheduler and the
//! execution history store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::jobs::history::ExecutionHistory;
use crate::jobs::models::JobExecution;
use crate::jobs::scheduler::{JobInfo, JobScheduler};
use crate::jobs::types::{JobKind, JobStatus};
use crate::repositories::{JobExecutionRepository, JobStats};

/// Point-in-time view of one job's state.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusSummary {
    /// "paused", "running", "scheduled", or "stopped"
    pub job_status: &'static str,
    pub is_paused: bool,
    pub next_run_time: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub last_execution: Option<JobExecution>,
}

/// Job service for handling job-related business logic.
#[derive(Clone)]
pub struct JobService {
    execution_repo: JobExecutionRepository,
    scheduler: Option<Arc<JobScheduler>>,
}

impl JobService {
    pub fn new(
        execution_repo: JobExecutionRepository,
        scheduler: Option<Arc<JobScheduler>>,
    ) -> Self {
        Self {
            execution_repo,
            scheduler,
        }
    }

    fn scheduler(&self) -> AppResult<&Arc<JobScheduler>> {
        self.scheduler
            .as_ref()
            .ok_or_else(|| AppError::UnprocessableContent {
                message: "Job scheduling is disabled".to_string(),
            })
    }

    /// Current state, last run summary, next run time, and failure count.
    pub async fn status(&self, kind: JobKind) -> AppResult<JobStatusSummary> {
        let last_execution = self.execution_repo.latest(kind).await?;
        let consecutive_failures = self.execution_repo.consecutive_failures(kind).await?;

        let (is_paused, next_run_time) = match &self.scheduler {
            Some(scheduler) => (
                scheduler.is_paused(kind).await,
                scheduler.next_run_time(kind).await,
            ),
            None => (self.execution_repo.is_paused(kind).await?, None),
        };

        let job_status = if is_paused {
            "paused"
        } else if last_execution
            .as_ref()
            .is_some_and(|e| e.status == JobStatus::Running)
        {
            "running"
        } else if self.scheduler.is_some() {
            "scheduled"
        } else {
            "stopped"
        };

        Ok(JobStatusSummary {
            job_status,
            is_paused,
            next_run_time,
            consecutive_failures,
            last_execution,
        })
    }

    /// All registered jobs with trigger and pause metadata. Empty when the
    /// scheduler is disabled.
    pub async fn list(&self) -> Vec<JobInfo> {
        match &self.scheduler {
            Some(scheduler) => scheduler.list_jobs().await,
            None => Vec::new(),
        }
    }

    /// Manually runs one tick of a job through the full gated pipeline.
    pub async fn trigger(&self, kind: JobKind) -> AppResult<()> {
        self.scheduler()?.trigger_now(kind).await
    }

    /// Manually stops (pauses) a job until it is explicitly resumed.
    pub async fn stop(&self, kind: JobKind) -> AppResult<()> {
        self.scheduler()?
            .pause_job(kind, "job manually stopped")
            .await
    }

    /// Manually resumes a stopped job.
    pub async fn resume(&self, kind: JobKind) -> AppResult<()> {
        self.scheduler()?.resume_job(kind).await
    }

    /// Paginated execution history, newest first, optionally filtered by
    /// status.
    pub async fn executions(
        &self,
        kind: JobKind,
        limit: i64,
        offset: i64,
        status: Option<JobStatus>,
    ) -> AppResult<(Vec<JobExecution>, i64)> {
        self.execution_repo
            .list_by_job(kind, limit, offset, status)
            .await
    }

    /// Aggregate statistics over the trailing window.
    pub async fn stats(&self, kind: JobKind, window_days: i64) -> AppResult<JobStats> {
        self.execution_repo.stats(kind, window_days).await
    }
}
