use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::jobs::history::ExecutionHistory;
use crate::jobs::models::NewJobExecution;
use crate::jobs::types::{FailureNotifier, JobKind, JobStatus};

/// Scheduler-side operations the breaker needs when it trips: suspend the
/// job's trigger and schedule the automatic resume.
#[async_trait]
pub trait PauseControl: Send + Sync {
    async fn pause(&self, kind: JobKind) -> AppResult<()>;
    async fn schedule_resume(&self, kind: JobKind, delay: Duration) -> AppResult<()>;
}

/// Outcome of the pre-tick gate check.
#[derive(Debug, PartialEq, Eq)]
pub enum TickGate {
    /// Failure count is below the threshold; run the tick.
    Proceed,
    /// The breaker tripped on this check; the tick must be dropped.
    Tripped { failures: u32 },
}

/// Pause-on-failure circuit breaker.
///
/// Where the retry executor absorbs transient failures inside a single tick,
/// the breaker watches for systemic failure across ticks: once a job has
/// failed `failure_threshold` consecutive times it is paused and a resume is
/// scheduled after a fixed cooldown. Resumption is unconditional.
pub struct CircuitBreaker {
    history: Arc<dyn ExecutionHistory>,
    failure_notifier: Arc<dyn FailureNotifier>,
    control: Arc<dyn PauseControl>,
    failure_threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(
        history: Arc<dyn ExecutionHistory>,
        failure_notifier: Arc<dyn FailureNotifier>,
        control: Arc<dyn PauseControl>,
        failure_threshold: u32,
        cooldown: Duration,
    ) -> Self {
        Self {
            history,
            failure_notifier,
            control,
            failure_threshold,
            cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Gate check run at the start of every scheduled tick, before the retry
    /// executor is engaged.
    pub async fn check(&self, kind: JobKind) -> AppResult<TickGate> {
        let failures = self.history.consecutive_failures(kind).await?;
        if failures < self.failure_threshold {
            return Ok(TickGate::Proceed);
        }

        self.trip(kind, failures).await?;
        Ok(TickGate::Tripped { failures })
    }

    async fn trip(&self, kind: JobKind, failures: u32) -> AppResult<()> {
        self.control.pause(kind).await?;
        self.control.schedule_resume(kind, self.cooldown).await?;

        let cooldown_hours = self.cooldown.as_secs() / 3600;
        let message = format!(
            "{} consecutive failures, job paused, will automatically resume in {} hour(s)",
            failures, cooldown_hours
        );
        self.history
            .create(NewJobExecution::marker(kind, JobStatus::Paused, &message))
            .await?;

        self.failure_notifier.notify(kind, &message, failures).await;

        tracing::warn!(
            job = %kind,
            consecutive_failures = failures,
            cooldown_hours,
            "Job paused by circuit breaker"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::testing::{MemoryFailureNotifier, MemoryHistory, MemoryPauseControl};

    const COOLDOWN: Duration = Duration::from_secs(6 * 3600);

    fn breaker(
        history: Arc<MemoryHistory>,
        notifier: Arc<MemoryFailureNotifier>,
        control: Arc<MemoryPauseControl>,
        threshold: u32,
    ) -> CircuitBreaker {
        CircuitBreaker::new(history, notifier, control, threshold, COOLDOWN)
    }

    #[tokio::test]
    async fn test_check_proceeds_below_threshold() {
        let history = Arc::new(MemoryHistory::new());
        let notifier = Arc::new(MemoryFailureNotifier::new());
        let control = Arc::new(MemoryPauseControl::new());
        let b = breaker(history.clone(), notifier.clone(), control.clone(), 3);

        history
            .push_terminal(JobKind::DataCollection, JobStatus::Failed)
            .await;
        history
            .push_terminal(JobKind::DataCollection, JobStatus::Failed)
            .await;

        let gate = b.check(JobKind::DataCollection).await.unwrap();
        assert_eq!(gate, TickGate::Proceed);
        assert!(control.paused.lock().await.is_empty());
        assert!(notifier.alerts().await.is_empty());
    }

    #[tokio::test]
    async fn test_check_trips_at_threshold() {
        let history = Arc::new(MemoryHistory::new());
        let notifier = Arc::new(MemoryFailureNotifier::new());
        let control = Arc::new(MemoryPauseControl::new());
        let b = breaker(history.clone(), notifier.clone(), control.clone(), 3);

        for _ in 0..3 {
            history
                .push_terminal(JobKind::DataCollection, JobStatus::Failed)
                .await;
        }

        let gate = b.check(JobKind::DataCollection).await.unwrap();
        assert_eq!(gate, TickGate::Tripped { failures: 3 });

        // Trigger suspended and resume scheduled after the cooldown.
        assert_eq!(*control.paused.lock().await, vec![JobKind::DataCollection]);
        assert_eq!(
            *control.resumes.lock().await,
            vec![(JobKind::DataCollection, COOLDOWN)]
        );

        // Paused marker written with the failure count in the message.
        let latest = history.latest(JobKind::DataCollection).await.unwrap().unwrap();
        assert_eq!(latest.status, JobStatus::Paused);
        assert_eq!(latest.completed_at, Some(latest.started_at));
        assert!(latest.error_message.as_deref().unwrap().contains("3 consecutive failures"));

        // The failure notifier fired.
        let alerts = notifier.alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].0, JobKind::DataCollection);
        assert_eq!(alerts[0].2, 3);
    }

    #[tokio::test]
    async fn test_failures_scoped_per_job() {
        let history = Arc::new(MemoryHistory::new());
        let notifier = Arc::new(MemoryFailureNotifier::new());
        let control = Arc::new(MemoryPauseControl::new());
        let b = breaker(history.clone(), notifier, control.clone(), 2);

        for _ in 0..5 {
            history
                .push_terminal(JobKind::DataCollection, JobStatus::Failed)
                .await;
        }

        // The other job's failure count is untouched.
        let gate = b.check(JobKind::NotificationDispatch).await.unwrap();
        assert_eq!(gate, TickGate::Proceed);
        assert!(control.paused.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_paused_marker_resets_visible_failure_count() {
        // Preserved semantics: the scan stops at the first non-failed record,
        // so the breaker's own paused marker hides the failures beneath it
        // and the post-resume window starts from zero.
        let history = Arc::new(MemoryHistory::new());
        let notifier = Arc::new(MemoryFailureNotifier::new());
        let control = Arc::new(MemoryPauseControl::new());
        let b = breaker(history.clone(), notifier, control.clone(), 3);

        for _ in 0..3 {
            history
                .push_terminal(JobKind::DataCollection, JobStatus::Failed)
                .await;
        }
        let gate = b.check(JobKind::DataCollection).await.unwrap();
        assert!(matches!(gate, TickGate::Tripped { .. }));

        assert_eq!(
            history
                .consecutive_failures(JobKind::DataCollection)
                .await
                .unwrap(),
            0
        );
        let gate = b.check(JobKind::DataCollection).await.unwrap();
        assert_eq!(gate, TickGate::Proceed);
        // Still only the one pause from the first trip.
        assert_eq!(control.paused.lock().await.len(), 1);
    }
}
