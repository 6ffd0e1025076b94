//! Job snapshot storage.
//!
//! Snapshots are always read and replaced whole, so a reader never observes
//! a half-applied transition.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domains::research::models::{Job, JobId};
use crate::error::Result;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert or replace the snapshot for `job.id`.
    async fn put(&self, job: Job) -> Result<()>;

    async fn get(&self, id: JobId) -> Result<Option<Job>>;

    /// All snapshots, newest first.
    async fn list(&self) -> Result<Vec<Job>>;

    async fn remove(&self, id: JobId) -> Result<Option<Job>>;
}

/// Process-local store. Jobs live until explicitly removed.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn put(&self, job: Job) -> Result<()> {
        self.jobs.write().await.insert(job.id, job);
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Job>> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn remove(&self, id: JobId) -> Result<Option<Job>> {
        Ok(self.jobs.write().await.remove(&id))
    }
}
