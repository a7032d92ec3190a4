//! Keyword-matching notification dispatcher.
//!
//! One pass: fetch active subscriptions and unprocessed events, match
//! keywords against event titles, bundle the matches into one message per
//! recipient, send best-effort, then mark every matched event processed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::provider::{NotificationMessage, NotifierRegistry};
use crate::error::AppResult;
use crate::models::ChannelType;

/// An active subscription as seen by the matcher: destination plus keyword
/// set. Inactive or addressless rows never reach this type.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub channel_type: ChannelType,
    pub destination_address: String,
    pub keywords: Vec<String>,
}

/// An unprocessed work item subject to keyword matching.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub id: i32,
    pub title: String,
}

/// Read-only view over active subscriptions.
#[async_trait]
pub trait SubscriptionSource: Send + Sync {
    /// All active subscriptions that carry a non-empty destination address.
    async fn list_active(&self) -> AppResult<Vec<Subscription>>;
}

/// Work-item queue access. The matcher's only mutation is `mark_processed`.
#[async_trait]
pub trait WorkItemSource: Send + Sync {
    async fn list_unprocessed(&self, limit: i64) -> AppResult<Vec<WorkItem>>;
    async fn mark_processed(&self, id: i32) -> AppResult<()>;
}

/// Counters from one dispatcher pass, stored as the job's result payload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    /// Subscriptions considered
    pub subscriptions_processed: i32,
    /// Distinct recipients that matched at least one item
    pub recipients_matched: i32,
    /// Messages successfully handed to a provider
    pub notifications_sent: i32,
    /// Unprocessed items fetched
    pub items_fetched: i32,
    /// Items matched by at least one subscription
    pub items_matched: i32,
}

/// The dispatcher itself. Stateless between passes; all state lives in the
/// sources.
pub struct NotificationDispatcher {
    subscriptions: Arc<dyn SubscriptionSource>,
    work_items: Arc<dyn WorkItemSource>,
    notifiers: Arc<NotifierRegistry>,
    digest_subject: String,
    page_size: i64,
}

impl NotificationDispatcher {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionSource>,
        work_items: Arc<dyn WorkItemSource>,
        notifiers: Arc<NotifierRegistry>,
        digest_subject: String,
        page_size: i64,
    ) -> Self {
        Self {
            subscriptions,
            work_items,
            notifiers,
            digest_subject,
            page_size,
        }
    }

    /// Runs one full match-and-notify pass.
    pub async fn run(&self) -> AppResult<DispatchReport> {
        let mut report = DispatchReport::default();

        let subscriptions = self.subscriptions.list_active().await?;
        if subscriptions.is_empty() {
            tracing::info!("No active subscriptions, nothing to dispatch");
            return Ok(report);
        }
        report.subscriptions_processed = subscriptions.len() as i32;

        let items = self.work_items.list_unprocessed(self.page_size).await?;
        if items.is_empty() {
            tracing::info!("No unprocessed events, nothing to dispatch");
            return Ok(report);
        }
        report.items_fetched = items.len() as i32;

        // Per recipient: channel, destination -> matched titles, in feed order.
        let mut digests: BTreeMap<(ChannelType, String), Vec<String>> = BTreeMap::new();
        let mut matched_ids: BTreeSet<i32> = BTreeSet::new();

        for subscription in &subscriptions {
            if subscription.destination_address.is_empty() {
                continue;
            }

            for item in &items {
                let title_lower = item.title.to_lowercase();
                for keyword in &subscription.keywords {
                    if title_lower.contains(&keyword.to_lowercase()) {
                        digests
                            .entry((
                                subscription.channel_type,
                                subscription.destination_address.clone(),
                            ))
                            .or_default()
                            .push(item.title.clone());
                        matched_ids.insert(item.id);
                        // One match per item per subscription is enough.
                        break;
                    }
                }
            }
        }

        report.recipients_matched = digests.len() as i32;
        report.items_matched = matched_ids.len() as i32;

        tracing::info!(
            subscriptions = report.subscriptions_processed,
            recipients = report.recipients_matched,
            items_matched = report.items_matched,
            "Keyword matching completed"
        );

        // One bundled message per recipient; a failed delivery is logged and
        // the fan-out continues.
        for ((channel, destination), titles) in &digests {
            let Some(notifier) = self.notifiers.get(*channel) else {
                tracing::error!(channel = ?channel, "No provider registered for channel, skipping recipient");
                continue;
            };

            let message = NotificationMessage {
                subject: self.digest_subject.clone(),
                body: format_digest(titles),
            };

            match notifier.send(destination, &message).await {
                Ok(result) if result.success => {
                    report.notifications_sent += 1;
                    tracing::info!(
                        destination = %destination,
                        provider = notifier.name(),
                        events = titles.len(),
                        "Notification sent"
                    );
                }
                Ok(result) => {
                    tracing::error!(
                        destination = %destination,
                        provider = notifier.name(),
                        response = result.response.as_deref().unwrap_or(""),
                        "Notification delivery failed"
                    );
                }
                Err(e) => {
                    tracing::error!(
                        destination = %destination,
                        provider = notifier.name(),
                        error = %e,
                        "Notification send errored"
                    );
                }
            }
        }

        // Matched items are "seen" regardless of delivery outcome; marking
        // happens once, after the whole fan-out.
        for id in &matched_ids {
            if let Err(e) = self.work_items.mark_processed(*id).await {
                tracing::error!(item_id = id, error = %e, "Failed to mark event processed");
            }
        }

        Ok(report)
    }
}

/// Numbered plain-text digest of matched event titles.
fn format_digest(titles: &[String]) -> String {
    let mut body = String::from(
        "Hello,\n\nThe following new events matched your watched keywords:\n\n",
    );
    for (i, title) in titles.iter().enumerate() {
        body.push_str(&format!("{}. {}\n", i + 1, title));
    }
    body.push_str("\nLog in to the club site for event details.\n");
    body.push_str("This message was sent automatically by the event monitor; please do not reply.\n");
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::notifications::provider::{NotificationResult, Notifier};
    use tokio::sync::Mutex;

    struct StaticSubscriptions(Vec<Subscription>);

    #[async_trait]
    impl SubscriptionSource for StaticSubscriptions {
        async fn list_active(&self) -> AppResult<Vec<Subscription>> {
            Ok(self.0.clone())
        }
    }

    struct MemoryQueue {
        items: Mutex<Vec<(WorkItem, bool)>>,
        list_calls: Mutex<u32>,
    }

    impl MemoryQueue {
        fn new(items: Vec<WorkItem>) -> Self {
            Self {
                items: Mutex::new(items.into_iter().map(|i| (i, false)).collect()),
                list_calls: Mutex::new(0),
            }
        }

        async fn processed_ids(&self) -> Vec<i32> {
            self.items
                .lock()
                .await
                .iter()
                .filter(|(_, processed)| *processed)
                .map(|(item, _)| item.id)
                .collect()
        }
    }

    #[async_trait]
    impl WorkItemSource for MemoryQueue {
        async fn list_unprocessed(&self, limit: i64) -> AppResult<Vec<WorkItem>> {
            *self.list_calls.lock().await += 1;
            Ok(self
                .items
                .lock()
                .await
                .iter()
                .filter(|(_, processed)| !processed)
                .take(limit as usize)
                .map(|(item, _)| item.clone())
                .collect())
        }

        async fn mark_processed(&self, id: i32) -> AppResult<()> {
            let mut items = self.items.lock().await;
            let (_, processed) = items
                .iter_mut()
                .find(|(item, _)| item.id == id)
                .ok_or_else(|| AppError::NotFound {
                    entity: "ScrapedEvent".to_string(),
                    field: "id".to_string(),
                    value: id.to_string(),
                })?;
            *processed = true;
            Ok(())
        }
    }

    /// Records sends; destinations listed in `failing` report failed delivery.
    struct MemoryNotifier {
        sent: Mutex<Vec<(String, NotificationMessage)>>,
        failing: Vec<String>,
    }

    impl MemoryNotifier {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                failing: Vec::new(),
            }
        }

        fn failing_for(destinations: &[&str]) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                failing: destinations.iter().map(|d| d.to_string()).collect(),
            }
        }

        async fn sent(&self) -> Vec<(String, NotificationMessage)> {
            self.sent.lock().await.clone()
        }
    }

    #[async_trait]
    impl Notifier for MemoryNotifier {
        async fn send(
            &self,
            destination: &str,
            message: &NotificationMessage,
        ) -> AppResult<NotificationResult> {
            let success = !self.failing.contains(&destination.to_string());
            if success {
                self.sent
                    .lock()
                    .await
                    .push((destination.to_string(), message.clone()));
            }
            Ok(NotificationResult {
                success,
                status_code: None,
                response: if success { None } else { Some("rejected".to_string()) },
                duration_ms: 1,
            })
        }

        fn name(&self) -> &'static str {
            "memory"
        }
    }

    fn email_sub(address: &str, keywords: &[&str]) -> Subscription {
        Subscription {
            channel_type: ChannelType::Email,
            destination_address: address.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn item(id: i32, title: &str) -> WorkItem {
        WorkItem {
            id,
            title: title.to_string(),
        }
    }

    fn dispatcher(
        subs: Vec<Subscription>,
        queue: Arc<MemoryQueue>,
        notifier: Arc<MemoryNotifier>,
    ) -> NotificationDispatcher {
        let mut registry = NotifierRegistry::new();
        registry.register(ChannelType::Email, notifier);
        NotificationDispatcher::new(
            Arc::new(StaticSubscriptions(subs)),
            queue,
            Arc::new(registry),
            "Your watched keywords matched new events".to_string(),
            100,
        )
    }

    #[tokio::test]
    async fn test_single_match_notifies_and_marks_processed() {
        let queue = Arc::new(MemoryQueue::new(vec![
            item(1, "AI Conference"),
            item(2, "Cooking Class"),
        ]));
        let notifier = Arc::new(MemoryNotifier::new());
        let d = dispatcher(
            vec![email_sub("a@x.com", &["AI"])],
            queue.clone(),
            notifier.clone(),
        );

        let report = d.run().await.unwrap();

        assert_eq!(report.subscriptions_processed, 1);
        assert_eq!(report.recipients_matched, 1);
        assert_eq!(report.notifications_sent, 1);
        assert_eq!(report.items_matched, 1);

        let sent = notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "a@x.com");
        assert!(sent[0].1.body.contains("AI Conference"));
        assert!(!sent[0].1.body.contains("Cooking Class"));

        // Item 1 marked processed, item 2 untouched.
        assert_eq!(queue.processed_ids().await, vec![1]);
    }

    #[tokio::test]
    async fn test_matching_is_case_insensitive_substring() {
        let queue = Arc::new(MemoryQueue::new(vec![item(1, "Python Workshop")]));
        let notifier = Arc::new(MemoryNotifier::new());
        let d = dispatcher(
            vec![email_sub("dev@x.com", &["python"])],
            queue.clone(),
            notifier.clone(),
        );

        let report = d.run().await.unwrap();
        assert_eq!(report.notifications_sent, 1);
        assert_eq!(queue.processed_ids().await, vec![1]);
    }

    #[tokio::test]
    async fn test_empty_keyword_set_never_matches() {
        let queue = Arc::new(MemoryQueue::new(vec![item(1, "Anything At All")]));
        let notifier = Arc::new(MemoryNotifier::new());
        let d = dispatcher(vec![email_sub("a@x.com", &[])], queue.clone(), notifier.clone());

        let report = d.run().await.unwrap();
        assert_eq!(report.recipients_matched, 0);
        assert_eq!(report.notifications_sent, 0);
        assert!(notifier.sent().await.is_empty());
        assert!(queue.processed_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_multiple_matches_bundle_into_one_message() {
        let queue = Arc::new(MemoryQueue::new(vec![
            item(1, "Rust Meetup"),
            item(2, "Rust Workshop"),
            item(3, "Knitting Circle"),
        ]));
        let notifier = Arc::new(MemoryNotifier::new());
        let d = dispatcher(
            vec![email_sub("a@x.com", &["rust"])],
            queue.clone(),
            notifier.clone(),
        );

        let report = d.run().await.unwrap();

        // Two matched items, but exactly one outbound message.
        assert_eq!(report.items_matched, 2);
        assert_eq!(report.notifications_sent, 1);
        let sent = notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.body.contains("1. Rust Meetup"));
        assert!(sent[0].1.body.contains("2. Rust Workshop"));
    }

    #[tokio::test]
    async fn test_item_matched_once_per_subscription_despite_multiple_keywords() {
        let queue = Arc::new(MemoryQueue::new(vec![item(1, "Rust and AI Summit")]));
        let notifier = Arc::new(MemoryNotifier::new());
        let d = dispatcher(
            vec![email_sub("a@x.com", &["rust", "ai"])],
            queue.clone(),
            notifier.clone(),
        );

        d.run().await.unwrap();

        let sent = notifier.sent().await;
        // The title appears exactly once in the digest.
        assert_eq!(sent[0].1.body.matches("Rust and AI Summit").count(), 1);
    }

    #[tokio::test]
    async fn test_per_recipient_failure_does_not_abort_fanout() {
        let queue = Arc::new(MemoryQueue::new(vec![item(1, "AI Conference")]));
        let notifier = Arc::new(MemoryNotifier::failing_for(&["a@x.com"]));
        let d = dispatcher(
            vec![
                email_sub("a@x.com", &["AI"]),
                email_sub("b@x.com", &["AI"]),
            ],
            queue.clone(),
            notifier.clone(),
        );

        let report = d.run().await.unwrap();

        assert_eq!(report.recipients_matched, 2);
        assert_eq!(report.notifications_sent, 1);
        let sent = notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "b@x.com");

        // The item is "seen" even though one delivery failed.
        assert_eq!(queue.processed_ids().await, vec![1]);
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let queue = Arc::new(MemoryQueue::new(vec![item(1, "AI Conference")]));
        let notifier = Arc::new(MemoryNotifier::new());
        let d = dispatcher(
            vec![email_sub("a@x.com", &["AI"])],
            queue.clone(),
            notifier.clone(),
        );

        let first = d.run().await.unwrap();
        assert_eq!(first.notifications_sent, 1);

        let second = d.run().await.unwrap();
        assert_eq!(second.notifications_sent, 0);
        assert_eq!(second.items_fetched, 0);
        assert_eq!(notifier.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_subscriptions_short_circuits() {
        let queue = Arc::new(MemoryQueue::new(vec![item(1, "AI Conference")]));
        let notifier = Arc::new(MemoryNotifier::new());
        let d = dispatcher(vec![], queue.clone(), notifier.clone());

        let report = d.run().await.unwrap();

        assert_eq!(report.subscriptions_processed, 0);
        assert_eq!(report.notifications_sent, 0);
        // The work queue is not even consulted.
        assert_eq!(*queue.list_calls.lock().await, 0);
    }

    #[tokio::test]
    async fn test_empty_work_queue_short_circuits() {
        let queue = Arc::new(MemoryQueue::new(vec![]));
        let notifier = Arc::new(MemoryNotifier::new());
        let d = dispatcher(
            vec![email_sub("a@x.com", &["AI"])],
            queue.clone(),
            notifier.clone(),
        );

        let report = d.run().await.unwrap();
        assert_eq!(report.subscriptions_processed, 1);
        assert_eq!(report.items_fetched, 0);
        assert!(notifier.sent().await.is_empty());
    }
}
