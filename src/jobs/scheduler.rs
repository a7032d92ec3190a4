use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler as TokioCronScheduler};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::JobsConfig;
use crate::error::{AppError, AppResult};
use crate::jobs::breaker::{CircuitBreaker, PauseControl, TickGate};
use crate::jobs::executor::{ConcurrencyTracker, RetryExecutor, TokioSleeper};
use crate::jobs::history::ExecutionHistory;
use crate::jobs::models::NewJobExecution;
use crate::jobs::registry::JobRegistry;
use crate::jobs::types::{FailureNotifier, JobKind, JobStatus};

/// Suspension state shared between the scheduler surface and the tick
/// pipeline. Triggers stay registered while a job is paused; ticks check
/// these flags first and drop silently.
#[derive(Default)]
pub(crate) struct TriggerFlags {
    paused: RwLock<HashSet<JobKind>>,
    shutdown: CancellationToken,
}

impl TriggerFlags {
    pub async fn is_paused(&self, kind: JobKind) -> bool {
        self.paused.read().await.contains(&kind)
    }

    pub async fn set_paused(&self, kind: JobKind, paused: bool) {
        let mut set = self.paused.write().await;
        if paused {
            set.insert(kind);
        } else {
            set.remove(&kind);
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// Introspection data for one registered job.
#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    pub kind: JobKind,
    pub job_name: &'static str,
    pub display_name: &'static str,
    pub interval_seconds: u64,
    pub max_instances: usize,
    pub is_paused: bool,
    pub next_run_time: Option<DateTime<Utc>>,
}

/// Owns the underlying cron scheduler plus the pause/resume primitives the
/// circuit breaker drives.
pub(crate) struct SchedulerControl {
    scheduler: Mutex<TokioCronScheduler>,
    job_ids: RwLock<HashMap<JobKind, Uuid>>,
    flags: Arc<TriggerFlags>,
    history: Arc<dyn ExecutionHistory>,
}

impl SchedulerControl {
    fn new(
        scheduler: TokioCronScheduler,
        flags: Arc<TriggerFlags>,
        history: Arc<dyn ExecutionHistory>,
    ) -> Self {
        Self {
            scheduler: Mutex::new(scheduler),
            job_ids: RwLock::new(HashMap::new()),
            flags,
            history,
        }
    }

    /// Re-enables a suspended trigger and records the `resumed` marker.
    /// Marker write failures are logged, never propagated; the resume itself
    /// must not be blocked by a history hiccup.
    async fn resume(&self, kind: JobKind, reason: &str) {
        self.flags.set_paused(kind, false).await;
        if let Err(e) = self
            .history
            .create(NewJobExecution::marker(kind, JobStatus::Resumed, reason))
            .await
        {
            tracing::error!(job = %kind, error = %e, "Failed to record resume event");
        }
        tracing::info!(job = %kind, reason, "Job resumed");
    }
}

#[async_trait]
impl PauseControl for SchedulerControl {
    async fn pause(&self, kind: JobKind) -> AppResult<()> {
        self.flags.set_paused(kind, true).await;
        tracing::info!(job = %kind, "Job trigger suspended");
        Ok(())
    }

    async fn schedule_resume(&self, kind: JobKind, delay: Duration) -> AppResult<()> {
        let flags = Arc::clone(&self.flags);
        let history = Arc::clone(&self.history);

        let resume_job = Job::new_one_shot_async(delay, move |_uuid, _lock| {
            let flags = Arc::clone(&flags);
            let history = Arc::clone(&history);
            Box::pin(async move {
                flags.set_paused(kind, false).await;
                if let Err(e) = history
                    .create(NewJobExecution::marker(
                        kind,
                        JobStatus::Resumed,
                        "job automatically resumed after cooldown",
                    ))
                    .await
                {
                    tracing::error!(job = %kind, error = %e, "Failed to record resume event");
                }
                tracing::info!(job = %kind, "Job automatically resumed after cooldown");
            })
        })
        .map_err(|e| AppError::Internal {
            source: anyhow::Error::from(e),
        })?;

        self.scheduler
            .lock()
            .await
            .add(resume_job)
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;

        tracing::info!(
            job = %kind,
            resume_in_seconds = delay.as_secs(),
            "Automatic resume scheduled"
        );
        Ok(())
    }
}

/// The per-tick pipeline: suspension checks, retention cleanup, the circuit
/// breaker gate, the overlap guard, then the retry executor.
pub(crate) struct JobRunner {
    registry: Arc<JobRegistry>,
    history: Arc<dyn ExecutionHistory>,
    breaker: CircuitBreaker,
    executor: RetryExecutor,
    tracker: ConcurrencyTracker,
    flags: Arc<TriggerFlags>,
    retention_days: i64,
}

impl JobRunner {
    pub(crate) fn new(
        registry: Arc<JobRegistry>,
        history: Arc<dyn ExecutionHistory>,
        breaker: CircuitBreaker,
        executor: RetryExecutor,
        flags: Arc<TriggerFlags>,
        retention_days: i64,
    ) -> Self {
        Self {
            registry,
            history,
            breaker,
            executor,
            tracker: ConcurrencyTracker::new(),
            flags,
            retention_days,
        }
    }

    /// Entry point for trigger callbacks. The outermost safety net: nothing
    /// escapes a tick except a log line.
    pub(crate) async fn run_tick(&self, kind: JobKind) {
        if let Err(e) = self.tick_inner(kind).await {
            tracing::error!(job = %kind, error = %e, "Job tick failed");
        }
    }

    async fn tick_inner(&self, kind: JobKind) -> AppResult<()> {
        if self.flags.is_shutdown() {
            return Ok(());
        }

        // Paused ticks are dropped before any history mutation, cleanup
        // included.
        if self.flags.is_paused(kind).await {
            tracing::debug!(job = %kind, "Trigger suspended, skipping tick");
            return Ok(());
        }
        if self.history.is_paused(kind).await? {
            tracing::info!(job = %kind, "Job is paused, skipping execution");
            return Ok(());
        }

        match self.history.cleanup(kind, self.retention_days).await {
            Ok(0) => {}
            Ok(deleted) => {
                tracing::info!(job = %kind, deleted, "Cleaned up old execution records");
            }
            Err(e) => {
                // Retention is best-effort; a failed cleanup must not cost a tick.
                tracing::warn!(job = %kind, error = %e, "Execution history cleanup failed");
            }
        }

        if let TickGate::Tripped { failures } = self.breaker.check(kind).await? {
            tracing::warn!(job = %kind, failures, "Tick dropped, circuit breaker tripped");
            return Ok(());
        }

        let descriptor = self.registry.get(kind).ok_or_else(|| AppError::NotFound {
            entity: "Job".to_string(),
            field: "kind".to_string(),
            value: kind.to_string(),
        })?;

        if !self.tracker.can_execute(kind, descriptor.max_instances).await {
            tracing::warn!(job = %kind, "Previous run still in flight, rejecting overlapping tick");
            return Ok(());
        }

        self.tracker.increment(kind).await;
        let result = self.executor.execute(descriptor.task.as_ref()).await;
        self.tracker.decrement(kind).await;

        result.map(|_| ())
    }
}

/// Recurring-job scheduler.
///
/// An explicitly constructed object owned by the composition root; anything
/// that needs pause/resume/introspection holds a reference, there is no
/// global scheduler state.
pub struct JobScheduler {
    control: Arc<SchedulerControl>,
    runner: Arc<JobRunner>,
    registry: Arc<JobRegistry>,
    flags: Arc<TriggerFlags>,
    history: Arc<dyn ExecutionHistory>,
}

impl JobScheduler {
    pub async fn new(
        registry: JobRegistry,
        history: Arc<dyn ExecutionHistory>,
        failure_notifier: Arc<dyn FailureNotifier>,
        config: &JobsConfig,
    ) -> AppResult<Self> {
        let scheduler = TokioCronScheduler::new()
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;

        let registry = Arc::new(registry);
        let flags = Arc::new(TriggerFlags::default());
        let control = Arc::new(SchedulerControl::new(
            scheduler,
            Arc::clone(&flags),
            Arc::clone(&history),
        ));

        let breaker = CircuitBreaker::new(
            Arc::clone(&history),
            Arc::clone(&failure_notifier),
            Arc::clone(&control) as Arc<dyn PauseControl>,
            config.failure_threshold,
            Duration::from_secs(config.pause_cooldown_hours * 3600),
        );
        let executor = RetryExecutor::new(
            Arc::clone(&history),
            failure_notifier,
            Arc::new(TokioSleeper),
            config.max_retries,
        );
        let runner = Arc::new(JobRunner::new(
            Arc::clone(&registry),
            Arc::clone(&history),
            breaker,
            executor,
            Arc::clone(&flags),
            config.history_retention_days,
        ));

        Ok(Self {
            control,
            runner,
            registry,
            flags,
            history,
        })
    }

    /// Registers every job's triggers and starts the scheduler.
    pub async fn start(&self) -> AppResult<()> {
        match self.history.sweep_orphaned_running().await {
            Ok(0) => {}
            Ok(swept) => {
                tracing::warn!(swept, "Marked orphaned running records as failed");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to sweep orphaned running records");
            }
        }

        for descriptor in self.registry.iter() {
            let kind = descriptor.kind;

            let runner = Arc::clone(&self.runner);
            let recurring = Job::new_repeated_async(descriptor.interval, move |_uuid, _lock| {
                let runner = Arc::clone(&runner);
                Box::pin(async move {
                    runner.run_tick(kind).await;
                })
            })
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;

            let job_id = self
                .control
                .scheduler
                .lock()
                .await
                .add(recurring)
                .await
                .map_err(|e| AppError::Internal {
                    source: anyhow::Error::from(e),
                })?;
            self.control.job_ids.write().await.insert(kind, job_id);

            if let Some(delay) = descriptor.startup_delay {
                let runner = Arc::clone(&self.runner);
                let startup = Job::new_one_shot_async(delay, move |_uuid, _lock| {
                    let runner = Arc::clone(&runner);
                    Box::pin(async move {
                        runner.run_tick(kind).await;
                    })
                })
                .map_err(|e| AppError::Internal {
                    source: anyhow::Error::from(e),
                })?;

                self.control
                    .scheduler
                    .lock()
                    .await
                    .add(startup)
                    .await
                    .map_err(|e| AppError::Internal {
                        source: anyhow::Error::from(e),
                    })?;
            }

            tracing::info!(
                job = %kind,
                interval_seconds = descriptor.interval.as_secs(),
                startup_delay_seconds = descriptor.startup_delay.map(|d| d.as_secs()),
                "Job scheduled"
            );
        }

        self.control
            .scheduler
            .lock()
            .await
            .start()
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;

        tracing::info!(jobs = self.registry.len(), "Job scheduler started");
        Ok(())
    }

    /// Stops dispatching new ticks and shuts the scheduler down. In-flight
    /// ticks are not forcibly cancelled; they run to natural completion.
    pub async fn shutdown(&self) -> AppResult<()> {
        self.flags.shutdown();
        self.control
            .scheduler
            .lock()
            .await
            .shutdown()
            .await
            .map_err(|e| AppError::Internal {
                source: anyhow::Error::from(e),
            })?;
        tracing::info!("Job scheduler stopped gracefully");
        Ok(())
    }

    /// Runs one tick of a job right now, through the full gated pipeline.
    /// Returns once the run is spawned, not once it completes.
    pub async fn trigger_now(&self, kind: JobKind) -> AppResult<()> {
        if self.registry.get(kind).is_none() {
            return Err(AppError::NotFound {
                entity: "Job".to_string(),
                field: "kind".to_string(),
                value: kind.to_string(),
            });
        }

        let runner = Arc::clone(&self.runner);
        tokio::spawn(async move {
            runner.run_tick(kind).await;
        });
        tracing::info!(job = %kind, "Manual job trigger requested");
        Ok(())
    }

    /// Manually suspends a job and writes a `paused` marker.
    pub async fn pause_job(&self, kind: JobKind, reason: &str) -> AppResult<()> {
        self.control.pause(kind).await?;
        self.history
            .create(NewJobExecution::marker(kind, JobStatus::Paused, reason))
            .await?;
        Ok(())
    }

    /// Manually resumes a suspended job and writes a `resumed` marker.
    pub async fn resume_job(&self, kind: JobKind) -> AppResult<()> {
        self.control.resume(kind, "job manually resumed").await;
        Ok(())
    }

    pub async fn is_paused(&self, kind: JobKind) -> bool {
        self.flags.is_paused(kind).await
    }

    pub async fn next_run_time(&self, kind: JobKind) -> Option<DateTime<Utc>> {
        let job_id = self.control.job_ids.read().await.get(&kind).copied()?;
        self.control
            .scheduler
            .lock()
            .await
            .next_tick_for_job(job_id)
            .await
            .ok()
            .flatten()
    }

    /// Lists every registered job with its trigger and pause metadata.
    pub async fn list_jobs(&self) -> Vec<JobInfo> {
        let mut jobs = Vec::with_capacity(self.registry.len());
        for descriptor in self.registry.iter() {
            jobs.push(JobInfo {
                kind: descriptor.kind,
                job_name: descriptor.kind.job_name(),
                display_name: descriptor.kind.display_name(),
                interval_seconds: descriptor.interval.as_secs(),
                max_instances: descriptor.max_instances,
                is_paused: self.is_paused(descriptor.kind).await,
                next_run_time: self.next_run_time(descriptor.kind).await,
            });
        }
        jobs.sort_by_key(|info| info.job_name);
        jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::registry::JobDescriptor;
    use crate::jobs::types::JobTask;
    use crate::jobs::testing::{
        MemoryFailureNotifier, MemoryHistory, MemoryPauseControl, RecordingSleeper, StaticTask,
    };

    fn registry_with(task: StaticTask) -> Arc<JobRegistry> {
        let kind = task.kind();
        let mut registry = JobRegistry::new();
        registry.register(JobDescriptor {
            kind,
            interval: Duration::from_secs(3600),
            startup_delay: None,
            max_instances: 1,
            task: Arc::new(task),
        });
        Arc::new(registry)
    }

    struct Fixture {
        history: Arc<MemoryHistory>,
        notifier: Arc<MemoryFailureNotifier>,
        pause_control: Arc<MemoryPauseControl>,
        flags: Arc<TriggerFlags>,
        runner: JobRunner,
    }

    fn fixture(task: StaticTask, failure_threshold: u32, max_retries: u32) -> Fixture {
        let registry = registry_with(task);
        let history = Arc::new(MemoryHistory::new());
        let notifier = Arc::new(MemoryFailureNotifier::new());
        let pause_control = Arc::new(MemoryPauseControl::new());
        let flags = Arc::new(TriggerFlags::default());

        let breaker = CircuitBreaker::new(
            history.clone(),
            notifier.clone(),
            pause_control.clone(),
            failure_threshold,
            Duration::from_secs(6 * 3600),
        );
        let executor = RetryExecutor::new(
            history.clone(),
            notifier.clone(),
            Arc::new(RecordingSleeper::new()),
            max_retries,
        );
        let runner = JobRunner::new(
            registry,
            history.clone(),
            breaker,
            executor,
            flags.clone(),
            90,
        );

        Fixture {
            history,
            notifier,
            pause_control,
            flags,
            runner,
        }
    }

    #[tokio::test]
    async fn test_tick_runs_job_to_success() {
        let f = fixture(
            StaticTask::succeeding(JobKind::DataCollection).with_counts(7, 2),
            3,
            3,
        );
        f.runner.run_tick(JobKind::DataCollection).await;

        let records = f.history.records_for(JobKind::DataCollection).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, JobStatus::Success);
        assert_eq!(records[0].items_scanned, Some(7));
    }

    #[tokio::test]
    async fn test_tick_skipped_while_trigger_suspended() {
        let f = fixture(StaticTask::succeeding(JobKind::DataCollection), 3, 3);
        f.flags.set_paused(JobKind::DataCollection, true).await;

        f.runner.run_tick(JobKind::DataCollection).await;

        // Dropped silently: no history mutation at all.
        assert!(f.history.records_for(JobKind::DataCollection).await.is_empty());
    }

    #[tokio::test]
    async fn test_tick_skipped_when_latest_record_is_paused() {
        let f = fixture(StaticTask::succeeding(JobKind::DataCollection), 3, 3);
        f.history
            .push_terminal(JobKind::DataCollection, JobStatus::Paused)
            .await;

        f.runner.run_tick(JobKind::DataCollection).await;

        let records = f.history.records_for(JobKind::DataCollection).await;
        assert_eq!(records.len(), 1); // only the pre-existing marker
    }

    #[tokio::test]
    async fn test_tick_trips_breaker_before_running_job() {
        let f = fixture(StaticTask::succeeding(JobKind::DataCollection), 3, 3);
        for _ in 0..3 {
            f.history
                .push_terminal(JobKind::DataCollection, JobStatus::Failed)
                .await;
        }

        f.runner.run_tick(JobKind::DataCollection).await;

        // No running/success record was created, only the paused marker.
        let records = f.history.records_for(JobKind::DataCollection).await;
        assert_eq!(records.len(), 4);
        assert_eq!(records.last().unwrap().status, JobStatus::Paused);
        assert_eq!(
            *f.pause_control.paused.lock().await,
            vec![JobKind::DataCollection]
        );
        assert_eq!(f.notifier.alerts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_tick_rejects_overlapping_run() {
        let f = fixture(StaticTask::succeeding(JobKind::DataCollection), 3, 3);
        f.runner.tracker.increment(JobKind::DataCollection).await;

        f.runner.run_tick(JobKind::DataCollection).await;

        assert!(f.history.records_for(JobKind::DataCollection).await.is_empty());
    }

    #[tokio::test]
    async fn test_tick_noop_after_shutdown() {
        let f = fixture(StaticTask::succeeding(JobKind::DataCollection), 3, 3);
        f.flags.shutdown();

        f.runner.run_tick(JobKind::DataCollection).await;

        assert!(f.history.records_for(JobKind::DataCollection).await.is_empty());
    }

    #[tokio::test]
    async fn test_failing_ticks_accumulate_then_pause() {
        // max_retries = 0 so each tick writes one failed record, threshold 2.
        let f = fixture(
            StaticTask::always_failing(JobKind::NotificationDispatch, "smtp down"),
            2,
            0,
        );

        f.runner.run_tick(JobKind::NotificationDispatch).await;
        f.runner.run_tick(JobKind::NotificationDispatch).await;
        // Third tick sees 2 consecutive failures and trips instead of running.
        f.runner.run_tick(JobKind::NotificationDispatch).await;

        let records = f.history.records_for(JobKind::NotificationDispatch).await;
        let statuses: Vec<JobStatus> = records.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![JobStatus::Failed, JobStatus::Failed, JobStatus::Paused]
        );
        assert_eq!(
            *f.pause_control.resumes.lock().await,
            vec![(JobKind::NotificationDispatch, Duration::from_secs(6 * 3600))]
        );

        // While the paused marker is on top, further ticks drop silently.
        f.runner.run_tick(JobKind::NotificationDispatch).await;
        assert_eq!(
            f.history.records_for(JobKind::NotificationDispatch).await.len(),
            3
        );
    }
}
