//! Repository layer for data access operations.
//!
//! Provides async CRUD operations for all domain entities.

mod job_execution_repo;
mod notify_setting_repo;
mod scraped_event_repo;

pub use job_execution_repo::{JobExecutionRepository, JobStats};
pub use notify_setting_repo::NotifySettingRepository;
pub use scraped_event_repo::ScrapedEventRepository;

use crate::db::AsyncDbPool;

/// Aggregates all repositories for convenient access.
///
/// Since `AsyncDbPool` uses `Arc` internally, cloning is cheap.
#[derive(Clone)]
pub struct Repositories {
    pub executions: JobExecutionRepository,
    pub notify_settings: NotifySettingRepository,
    pub events: ScrapedEventRepository,
}

impl Repositories {
    /// Creates a new Repositories instance with all repositories initialized.
    pub fn new(pool: AsyncDbPool) -> Self {
        Self {
            executions: JobExecutionRepository::new(pool.clone()),
            notify_settings: NotifySettingRepository::new(pool.clone()),
            events: ScrapedEventRepository::new(pool),
        }
    }
}
