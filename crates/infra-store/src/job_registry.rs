// In-memory JobRegistry Implementation

use async_trait::async_trait;
use backdrop_core::domain::{JobId, JobRecord, JobStatus, JobUpdate, MethodName};
use backdrop_core::error::{AppError, Result};
use backdrop_core::port::{JobRegistry, TimeProvider};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Process-local job registry
///
/// Job state is not persisted: a restart forgets every job. All writes go
/// through one lock, so updates to a job are applied and observed in the order
/// they were issued.
pub struct InMemoryJobRegistry {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
    time_provider: Arc<dyn TimeProvider>,
}

impl InMemoryJobRegistry {
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            time_provider,
        }
    }

    /// Number of jobs known to the registry
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl JobRegistry for InMemoryJobRegistry {
    async fn create(&self, id: &JobId, method: MethodName) -> Result<()> {
        let now = self.time_provider.now_millis();
        let mut jobs = self.jobs.write().await;

        if jobs.contains_key(id) {
            return Err(AppError::Conflict(format!("Job {} already exists", id)));
        }
        jobs.insert(id.clone(), JobRecord::new(id.clone(), method, now));
        debug!(job_id = %id, "Job registered");
        Ok(())
    }

    async fn update(&self, id: &JobId, update: JobUpdate) -> Result<JobRecord> {
        let now = self.time_provider.now_millis();
        let mut jobs = self.jobs.write().await;

        let record = jobs
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))?;
        record.apply(update, now)?;
        Ok(record.clone())
    }

    async fn get(&self, id: &JobId) -> Result<Option<JobRecord>> {
        Ok(self.jobs.read().await.get(id).cloned())
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<usize> {
        Ok(self
            .jobs
            .read()
            .await
            .values()
            .filter(|record| record.status == status)
            .count())
    }
}
