use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::AppResult;
use crate::jobs::types::{JobKind, JobOutcome, JobTask};

/// Result of one collection pass over the external feed.
#[derive(Debug, Clone, Default)]
pub struct CollectorReport {
    /// Events seen in the feed
    pub events_fetched: i32,
    /// Events that were new and saved
    pub events_saved: i32,
    /// Full structured result for the execution record
    pub payload: JsonValue,
}

/// Opaque data source for the collection job: fetches the external feed and
/// persists whatever is new, raising on failure.
#[async_trait]
pub trait EventCollector: Send + Sync {
    async fn collect(&self) -> AppResult<CollectorReport>;
}

/// Job body for the recurring event-collection job.
pub struct DataCollectionTask {
    collector: Arc<dyn EventCollector>,
}

impl DataCollectionTask {
    pub fn new(collector: Arc<dyn EventCollector>) -> Self {
        Self { collector }
    }
}

#[async_trait]
impl JobTask for DataCollectionTask {
    fn kind(&self) -> JobKind {
        JobKind::DataCollection
    }

    async fn run(&self) -> AppResult<JobOutcome> {
        let report = self.collector.collect().await?;

        tracing::info!(
            events_fetched = report.events_fetched,
            events_saved = report.events_saved,
            "Event collection pass completed"
        );

        Ok(JobOutcome {
            items_scanned: report.events_fetched,
            items_new: report.events_saved,
            payload: report.payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    struct StubCollector {
        fail: bool,
    }

    #[async_trait]
    impl EventCollector for StubCollector {
        async fn collect(&self) -> AppResult<CollectorReport> {
            if self.fail {
                return Err(AppError::External {
                    service: "event feed".to_string(),
                    source: anyhow::Error::msg("HTTP 502"),
                });
            }
            Ok(CollectorReport {
                events_fetched: 20,
                events_saved: 3,
                payload: serde_json::json!({"events_fetched": 20, "events_saved": 3}),
            })
        }
    }

    #[tokio::test]
    async fn test_outcome_maps_collector_counters() {
        let task = DataCollectionTask::new(Arc::new(StubCollector { fail: false }));
        let outcome = task.run().await.unwrap();
        assert_eq!(outcome.items_scanned, 20);
        assert_eq!(outcome.items_new, 3);
        assert_eq!(task.kind(), JobKind::DataCollection);
    }

    #[tokio::test]
    async fn test_collector_failure_propagates_to_retry_ladder() {
        let task = DataCollectionTask::new(Arc::new(StubCollector { fail: true }));
        let result = task.run().await;
        assert!(matches!(result, Err(AppError::External { .. })));
    }
}
