use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::jobs::types::{JobKind, JobTask};

/// Everything the scheduler needs to know about one recurring job.
#[derive(Clone)]
pub struct JobDescriptor {
    pub kind: JobKind,
    /// Fixed interval between ticks
    pub interval: Duration,
    /// When set, a one-shot run is scheduled this long after startup
    pub startup_delay: Option<Duration>,
    /// Overlapping ticks beyond this count are rejected, not queued
    pub max_instances: usize,
    pub task: Arc<dyn JobTask>,
}

/// Registry mapping job kinds to their descriptors.
///
/// The scheduler iterates this uniformly instead of branching per job name.
#[derive(Default)]
pub struct JobRegistry {
    jobs: HashMap<JobKind, JobDescriptor>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: HashMap::new(),
        }
    }

    /// Registers a descriptor, replacing any previous entry for the kind.
    pub fn register(&mut self, descriptor: JobDescriptor) -> &mut Self {
        let kind = descriptor.kind;
        if self.jobs.insert(kind, descriptor).is_some() {
            tracing::warn!(job = %kind, "Job descriptor replaced in registry");
        }
        self
    }

    pub fn get(&self, kind: JobKind) -> Option<&JobDescriptor> {
        self.jobs.get(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobDescriptor> {
        self.jobs.values()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
