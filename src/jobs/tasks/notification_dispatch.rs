use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::jobs::types::{JobKind, JobOutcome, JobTask};
use crate::services::notifications::NotificationDispatcher;

/// Job body for the recurring keyword-matching notification job.
pub struct NotificationDispatchTask {
    dispatcher: Arc<NotificationDispatcher>,
}

impl NotificationDispatchTask {
    pub fn new(dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl JobTask for NotificationDispatchTask {
    fn kind(&self) -> JobKind {
        JobKind::NotificationDispatch
    }

    async fn run(&self) -> AppResult<JobOutcome> {
        let report = self.dispatcher.run().await?;

        Ok(JobOutcome {
            items_scanned: report.subscriptions_processed,
            items_new: report.notifications_sent,
            payload: serde_json::to_value(&report).unwrap_or_default(),
        })
    }
}
