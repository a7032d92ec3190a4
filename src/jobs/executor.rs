use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::AppResult;
use crate::jobs::history::ExecutionHistory;
use crate::jobs::models::{NewJobExecution, UpdateJobExecution};
use crate::jobs::types::{FailureNotifier, JobKind, JobStatus, JobTask};

/// Sleep seam so the retry ladder is testable without wall-clock waits.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the tokio timer. Sleeps are non-blocking and
/// yield to the runtime, so other jobs' ticks interleave during a backoff
/// window.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Linear backoff: 1 min after the first failure, 2 min after the second,
/// and so on.
pub(crate) fn retry_delay(retry_number: u32) -> Duration {
    Duration::from_secs(60 * retry_number as u64)
}

/// Tracks in-flight ticks per job so overlapping runs are rejected rather
/// than queued.
#[derive(Clone, Default)]
pub struct ConcurrencyTracker {
    running: Arc<RwLock<HashMap<JobKind, usize>>>,
}

impl ConcurrencyTracker {
    pub fn new() -> Self {
        Self {
            running: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn can_execute(&self, kind: JobKind, max_instances: usize) -> bool {
        let running = self.running.read().await;
        running.get(&kind).copied().unwrap_or(0) < max_instances
    }

    pub async fn increment(&self, kind: JobKind) {
        let mut running = self.running.write().await;
        *running.entry(kind).or_insert(0) += 1;
    }

    pub async fn decrement(&self, kind: JobKind) {
        let mut running = self.running.write().await;
        if let Some(count) = running.get_mut(&kind) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                running.remove(&kind);
            }
        }
    }
}

/// State of one tick's retry ladder. Backoff is a distinct state so the
/// ladder advances through explicit transitions rather than ad-hoc sleeps.
enum AttemptState {
    /// About to run the job body; the counter is retries consumed so far.
    Attempting(u32),
    /// Waiting out the delay before the numbered retry runs.
    Backoff { next_retry: u32, delay: Duration },
    /// The ladder is done; the record has been finalized.
    Terminal(JobStatus),
}

/// Runs a job body with bounded retries and linear backoff, recording the
/// attempt group into execution history.
///
/// Total attempts = 1 + `max_retries`. Errors from the job body never
/// propagate out of `execute`; only history persistence failures do, and the
/// scheduler's outer safety net logs those.
pub struct RetryExecutor {
    history: Arc<dyn ExecutionHistory>,
    failure_notifier: Arc<dyn FailureNotifier>,
    sleeper: Arc<dyn Sleeper>,
    max_retries: u32,
}

impl RetryExecutor {
    pub fn new(
        history: Arc<dyn ExecutionHistory>,
        failure_notifier: Arc<dyn FailureNotifier>,
        sleeper: Arc<dyn Sleeper>,
        max_retries: u32,
    ) -> Self {
        Self {
            history,
            failure_notifier,
            sleeper,
            max_retries,
        }
    }

    /// Executes one tick's retry ladder and returns the terminal status.
    pub async fn execute(&self, task: &dyn JobTask) -> AppResult<JobStatus> {
        let kind = task.kind();
        let record = self.history.create(NewJobExecution::running(kind)).await?;
        let started = Instant::now();

        let mut state = AttemptState::Attempting(0);
        loop {
            state = match state {
                AttemptState::Attempting(retry_count) => {
                    self.attempt(task, record.id, started, retry_count).await?
                }
                AttemptState::Backoff { next_retry, delay } => {
                    self.sleeper.sleep(delay).await;
                    AttemptState::Attempting(next_retry)
                }
                AttemptState::Terminal(status) => return Ok(status),
            };
        }
    }

    /// One run of the job body plus the transition it produces.
    async fn attempt(
        &self,
        task: &dyn JobTask,
        record_id: i64,
        started: Instant,
        retry_count: u32,
    ) -> AppResult<AttemptState> {
        let kind = task.kind();

        match task.run().await {
            Ok(outcome) => {
                let duration = started.elapsed().as_secs() as i32;
                self.history
                    .update(
                        record_id,
                        UpdateJobExecution::success(duration, &outcome, retry_count),
                    )
                    .await?;
                tracing::info!(
                    job = %kind,
                    duration_seconds = duration,
                    items_scanned = outcome.items_scanned,
                    items_new = outcome.items_new,
                    retry_count,
                    "Job executed successfully"
                );
                Ok(AttemptState::Terminal(JobStatus::Success))
            }
            Err(e) => {
                let retry_count = retry_count + 1;
                let error_message = e.to_string();

                if retry_count > self.max_retries {
                    let duration = started.elapsed().as_secs() as i32;
                    self.history
                        .update(
                            record_id,
                            UpdateJobExecution::failed(duration, error_message.clone(), retry_count),
                        )
                        .await?;
                    tracing::error!(
                        job = %kind,
                        attempts = retry_count,
                        error = %error_message,
                        "Job failed after exhausting retries"
                    );
                    // Fire-and-forget; the notifier swallows its own errors.
                    self.failure_notifier
                        .notify(kind, &error_message, retry_count)
                        .await;
                    return Ok(AttemptState::Terminal(JobStatus::Failed));
                }

                let delay = retry_delay(retry_count);
                tracing::warn!(
                    job = %kind,
                    attempt = retry_count,
                    max_retries = self.max_retries,
                    retry_in_seconds = delay.as_secs(),
                    error = %error_message,
                    "Job attempt failed, retrying"
                );
                Ok(AttemptState::Backoff {
                    next_retry: retry_count,
                    delay,
                })
            }
        }
    }
}
