//! Job bodies for the two recurring jobs.

mod data_collection;
mod notification_dispatch;

pub use data_collection::{CollectorReport, DataCollectionTask, EventCollector};
pub use notification_dispatch::NotificationDispatchTask;
