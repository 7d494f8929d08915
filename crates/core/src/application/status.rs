// Status Query Use Case

use crate::domain::{JobId, JobRecord, JobStatus, Stage};
use crate::error::{AppError, Result};
use crate::port::JobRegistry;
use serde::Serialize;
use std::path::PathBuf;

/// What a poller sees while a job is not completed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub status: JobStatus,
    pub progress: f64,
    pub message: Option<String>,
    pub stage: Stage,
}

impl From<&JobRecord> for JobSnapshot {
    fn from(record: &JobRecord) -> Self {
        Self {
            status: record.status,
            progress: record.progress,
            message: record.message.clone(),
            stage: record.stage,
        }
    }
}

/// Result of a status query
#[derive(Debug, Clone, PartialEq)]
pub enum StatusView {
    /// Processing or failed
    Pending(JobSnapshot),
    /// Completed, artifact present on disk
    Ready { output_path: PathBuf, size_bytes: u64 },
}

/// Look up a job and, if completed, confirm its artifact still exists
///
/// # Errors
/// - AppError::NotFound if the id was never admitted
/// - AppError::ArtifactMissing if the job completed but its output is gone;
///   the record itself is left untouched
pub async fn query_status(registry: &dyn JobRegistry, job_id: &JobId) -> Result<StatusView> {
    let record = registry
        .get(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Video ID not found".to_string()))?;

    if record.status != JobStatus::Completed {
        return Ok(StatusView::Pending(JobSnapshot::from(&record)));
    }

    let missing = || AppError::ArtifactMissing("Processed video file not found".to_string());
    let output_path = record.output_path.clone().ok_or_else(missing)?;
    match tokio::fs::metadata(&output_path).await {
        Ok(meta) if meta.is_file() => Ok(StatusView::Ready {
            output_path,
            size_bytes: meta.len(),
        }),
        _ => Err(missing()),
    }
}
