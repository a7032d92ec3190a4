//! Application state for the Axum web framework.
//!
//! Contains shared services and resources accessible across all request
//! handlers.

use std::sync::Arc;

use crate::db::AsyncDbPool;
use crate::jobs::JobScheduler;
use crate::repositories::Repositories;
use crate::services::Services;

/// Application state containing all shared services and resources.
///
/// Designed to be used with Axum's State extractor. Cloning is cheap since
/// Services and AsyncDbPool use Arc internally.
#[derive(Clone)]
pub struct AppState {
    /// All business logic services
    pub services: Services,
    /// Direct access to the database connection pool
    pub db_pool: AsyncDbPool,
    /// Scheduler handle; None when job scheduling is disabled
    pub scheduler: Option<Arc<JobScheduler>>,
}

impl AppState {
    /// Creates a new AppState from a connection pool and the optional
    /// scheduler handle.
    pub fn new(pool: AsyncDbPool, scheduler: Option<Arc<JobScheduler>>) -> Self {
        let repos = Repositories::new(pool.clone());
        let services = Services::new(repos, scheduler.clone());
        Self {
            services,
            db_pool: pool,
            scheduler,
        }
    }
}
