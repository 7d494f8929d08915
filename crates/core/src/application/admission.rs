// Admission Use Case
// Persist the upload, register the job, start the pipeline without waiting on it

use super::pipeline::FramePipeline;
use crate::domain::{JobId, MethodName, StorageLayout};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, JobRegistry};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Upload written to disk under a fresh job id, not yet registered
#[derive(Debug)]
pub struct StagedUpload {
    job_id: JobId,
    path: PathBuf,
    bytes: u64,
}

impl StagedUpload {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

/// A job that has been registered and handed to the pipeline
pub struct AdmittedJob {
    pub job_id: JobId,

    /// Pipeline task; callers normally detach it, tests await it
    pub task: JoinHandle<()>,
}

/// Admission service
pub struct AdmissionService {
    registry: Arc<dyn JobRegistry>,
    id_provider: Arc<dyn IdProvider>,
    pipeline: Arc<FramePipeline>,
    layout: StorageLayout,
}

impl AdmissionService {
    pub fn new(
        registry: Arc<dyn JobRegistry>,
        id_provider: Arc<dyn IdProvider>,
        pipeline: Arc<FramePipeline>,
    ) -> Self {
        let layout = pipeline.layout().clone();
        Self {
            registry,
            id_provider,
            pipeline,
            layout,
        }
    }

    /// Stream an upload into working storage under a new job id
    ///
    /// # Errors
    /// - AppError::Validation if the upload is empty
    /// - AppError::Io if storage is not writable or the stream breaks;
    ///   the partial file is removed
    pub async fn stage_upload<R>(&self, reader: &mut R) -> Result<StagedUpload>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        self.layout.ensure().await?;

        let job_id = self.id_provider.generate_id();
        let path = self.layout.input_path(&job_id);

        let written = write_upload(&path, reader).await;
        let bytes = match written {
            Ok(0) => {
                remove_quietly(&path).await;
                return Err(AppError::Validation("Uploaded file is empty".to_string()));
            }
            Ok(bytes) => bytes,
            Err(e) => {
                remove_quietly(&path).await;
                return Err(e.into());
            }
        };

        Ok(StagedUpload {
            job_id,
            path,
            bytes,
        })
    }

    /// Register a staged upload and start its pipeline
    ///
    /// Returns as soon as the job is registered; processing continues in the
    /// background.
    pub async fn admit(&self, staged: StagedUpload, method: MethodName) -> Result<AdmittedJob> {
        if let Err(e) = self.registry.create(&staged.job_id, method.clone()).await {
            self.discard(staged).await;
            return Err(e);
        }

        info!(
            job_id = %staged.job_id,
            method = %method,
            bytes = staged.bytes,
            "Job admitted"
        );

        let pipeline = Arc::clone(&self.pipeline);
        let task = tokio::spawn(pipeline.run(staged.job_id.clone(), method));

        Ok(AdmittedJob {
            job_id: staged.job_id,
            task,
        })
    }

    /// Remove a staged upload that will never be admitted
    pub async fn discard(&self, staged: StagedUpload) {
        remove_quietly(&staged.path).await;
    }

    /// Stage and admit in one step
    pub async fn submit<R>(&self, reader: &mut R, method: MethodName) -> Result<AdmittedJob>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let staged = self.stage_upload(reader).await?;
        self.admit(staged, method).await
    }
}

async fn write_upload<R>(path: &Path, reader: &mut R) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut file = tokio::fs::File::create(path).await?;
    let bytes = tokio::io::copy(reader, &mut file).await?;
    file.flush().await?;
    Ok(bytes)
}

async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove staged upload"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pipeline::{BackendRegistry, PipelineConfig};
    use crate::port::id_provider::SequentialIdProvider;
    use crate::port::job_registry::MockJobRegistry;
    use crate::port::process_runner::mocks::ScriptedProcessRunner;
    use tempfile::TempDir;

    fn service(storage: &TempDir, registry: MockJobRegistry) -> AdmissionService {
        let registry: Arc<dyn JobRegistry> = Arc::new(registry);
        let pipeline = Arc::new(FramePipeline::new(
            Arc::clone(&registry),
            Arc::new(ScriptedProcessRunner::for_frames(1)),
            BackendRegistry::new(),
            StorageLayout::new(storage.path()),
            PipelineConfig::default(),
        ));
        AdmissionService::new(
            registry,
            Arc::new(SequentialIdProvider::new("job")),
            pipeline,
        )
    }

    #[tokio::test]
    async fn test_stage_upload_writes_input_file() {
        let storage = TempDir::new().unwrap();
        let service = service(&storage, MockJobRegistry::new());

        let mut upload: &[u8] = b"fake mp4 bytes";
        let staged = service.stage_upload(&mut upload).await.unwrap();

        assert_eq!(staged.job_id(), "job-1");
        assert_eq!(staged.bytes(), 14);
        assert_eq!(staged.path(), storage.path().join("input_job-1.mp4"));
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"fake mp4 bytes");
    }

    #[tokio::test]
    async fn test_empty_upload_is_rejected() {
        let storage = TempDir::new().unwrap();
        let service = service(&storage, MockJobRegistry::new());

        let mut upload: &[u8] = b"";
        let result = service.stage_upload(&mut upload).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(!storage.path().join("input_job-1.mp4").exists());
    }

    #[tokio::test]
    async fn test_failed_registration_discards_upload() {
        let storage = TempDir::new().unwrap();
        let mut registry = MockJobRegistry::new();
        registry
            .expect_create()
            .times(1)
            .returning(|id, _| Err(AppError::Conflict(format!("job {} exists", id))));

        let service = service(&storage, registry);
        let mut upload: &[u8] = b"video";
        let staged = service.stage_upload(&mut upload).await.unwrap();
        let path = staged.path().to_path_buf();

        let result = service.admit(staged, MethodName::new("u2net")).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(!path.exists());
    }
}
