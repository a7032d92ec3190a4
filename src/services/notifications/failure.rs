//! Operational failure alerts for the job core.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::provider::{NotificationMessage, Notifier};
use crate::jobs::types::{FailureNotifier, JobKind};

/// Sends job-failure and pause alerts to a configured ops destination.
///
/// Every error on this path is swallowed after logging: alerting must never
/// affect the job pipeline that triggered it.
pub struct OpsNotifier {
    notifier: Arc<dyn Notifier>,
    destination: String,
}

impl OpsNotifier {
    pub fn new(notifier: Arc<dyn Notifier>, destination: String) -> Self {
        Self {
            notifier,
            destination,
        }
    }
}

#[async_trait]
impl FailureNotifier for OpsNotifier {
    async fn notify(&self, kind: JobKind, error_message: &str, retry_count: u32) {
        let message = NotificationMessage {
            subject: format!("Job failure alert: {}", kind.display_name()),
            body: format!(
                "Job execution failed.\n\nJob: {}\nError: {}\nRetry attempts: {}\nTime: {}\n\nCheck the application logs for details.",
                kind.job_name(),
                error_message,
                retry_count,
                Utc::now().to_rfc3339(),
            ),
        };

        match self.notifier.send(&self.destination, &message).await {
            Ok(result) if result.success => {
                tracing::debug!(job = %kind, destination = %self.destination, "Failure alert sent");
            }
            Ok(result) => {
                tracing::error!(
                    job = %kind,
                    destination = %self.destination,
                    response = result.response.as_deref().unwrap_or(""),
                    "Failure alert delivery failed"
                );
            }
            Err(e) => {
                tracing::error!(job = %kind, error = %e, "Failed to send failure alert");
            }
        }
    }
}

/// Used when no ops destination is configured; alerts become log lines.
pub struct NoopFailureNotifier;

#[async_trait]
impl FailureNotifier for NoopFailureNotifier {
    async fn notify(&self, kind: JobKind, error_message: &str, retry_count: u32) {
        tracing::warn!(
            job = %kind,
            error = %error_message,
            retry_count,
            "Job failure alert (no ops destination configured)"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use crate::services::notifications::provider::NotificationResult;
    use tokio::sync::Mutex;

    struct StubNotifier {
        sent: Mutex<Vec<(String, String)>>,
        errors: bool,
    }

    #[async_trait]
    impl Notifier for StubNotifier {
        async fn send(
            &self,
            destination: &str,
            message: &NotificationMessage,
        ) -> AppResult<NotificationResult> {
            if self.errors {
                return Err(AppError::External {
                    service: "smtp".to_string(),
                    source: anyhow::Error::msg("connect refused"),
                });
            }
            self.sent
                .lock()
                .await
                .push((destination.to_string(), message.subject.clone()));
            Ok(NotificationResult {
                success: true,
                status_code: None,
                response: None,
                duration_ms: 1,
            })
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    #[tokio::test]
    async fn test_ops_notifier_sends_alert_with_context() {
        let stub = Arc::new(StubNotifier {
            sent: Mutex::new(Vec::new()),
            errors: false,
        });
        let ops = OpsNotifier::new(stub.clone(), "ops@example.com".to_string());

        ops.notify(JobKind::DataCollection, "feed unreachable", 4).await;

        let sent = stub.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "ops@example.com");
        assert!(sent[0].1.contains("Event Collector"));
    }

    #[tokio::test]
    async fn test_ops_notifier_swallows_transport_errors() {
        let stub = Arc::new(StubNotifier {
            sent: Mutex::new(Vec::new()),
            errors: true,
        });
        let ops = OpsNotifier::new(stub, "ops@example.com".to_string());

        // Must not panic or propagate.
        ops.notify(JobKind::NotificationDispatch, "boom", 1).await;
    }
}
