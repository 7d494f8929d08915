// Job Registry Port (Interface)

use crate::domain::{JobId, JobRecord, JobStatus, JobUpdate, MethodName};
use crate::error::Result;
use async_trait::async_trait;

/// Concurrent store of job status records.
///
/// Sole source of truth for in-flight and finished jobs. One writer per job
/// (its orchestrator), any number of readers. Updates to one job must be
/// observed in the order they were written.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Register a freshly admitted job (Conflict if the id already exists)
    async fn create(&self, id: &JobId, method: MethodName) -> Result<()>;

    /// Apply an update and return the resulting record (NotFound if unknown)
    async fn update(&self, id: &JobId, update: JobUpdate) -> Result<JobRecord>;

    /// Snapshot of a job record
    async fn get(&self, id: &JobId) -> Result<Option<JobRecord>>;

    /// Count jobs by status
    async fn count_by_status(&self, status: JobStatus) -> Result<usize>;
}
