//! Service layer for business logic operations.
//!
//! Services encapsulate business logic and coordinate between
//! repositories, the job scheduler, and handlers.

mod job_service;
pub mod notifications;

pub use job_service::{JobService, JobStatusSummary};

use std::sync::Arc;

use crate::jobs::JobScheduler;
use crate::repositories::Repositories;

/// Aggregates all services for convenient access.
///
/// This struct is designed to be used as Axum application state.
/// Cloning is cheap since underlying pools use `Arc` internally.
#[derive(Clone)]
pub struct Services {
    pub jobs: JobService,
}

impl Services {
    /// Creates a new Services instance from repositories and the optional
    /// scheduler handle (absent when job scheduling is disabled).
    pub fn new(repos: Repositories, scheduler: Option<Arc<JobScheduler>>) -> Self {
        Self {
            jobs: JobService::new(repos.executions, scheduler),
        }
    }
}
