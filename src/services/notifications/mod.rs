//! Notification delivery: provider abstraction, concrete transports, the
//! keyword-matching dispatcher, and operational failure alerts.

mod dispatcher;
mod email_provider;
mod failure;
mod provider;
mod webhook_provider;

pub use dispatcher::{
    DispatchReport, NotificationDispatcher, Subscription, SubscriptionSource, WorkItem,
    WorkItemSource,
};
pub use email_provider::EmailProvider;
pub use failure::{NoopFailureNotifier, OpsNotifier};
pub use provider::{NotificationMessage, NotificationResult, Notifier, NotifierRegistry};
pub use webhook_provider::WebhookProvider;
