//! Shared fixtures: a real pipeline wired to scripted tools and a mock segmenter

#![allow(dead_code)]

use async_trait::async_trait;
use backdrop_core::application::{
    AcceleratorPool, AdmissionService, BackendRegistry, FramePipeline, PipelineConfig,
};
use backdrop_core::domain::{JobId, JobRecord, JobStatus, JobUpdate, MethodName, StorageLayout};
use backdrop_core::error::Result;
use backdrop_core::port::id_provider::SequentialIdProvider;
use backdrop_core::port::process_runner::mocks::ScriptedProcessRunner;
use backdrop_core::port::segmentation::mocks::MockSegmenter;
use backdrop_core::port::time_provider::SystemTimeProvider;
use backdrop_core::port::{AcceleratorDevice, JobRegistry};
use backdrop_infra_store::InMemoryJobRegistry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Registry that keeps every record version it hands out
pub struct RecordingRegistry {
    inner: InMemoryJobRegistry,
    history: Mutex<HashMap<JobId, Vec<JobRecord>>>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self {
            inner: InMemoryJobRegistry::new(Arc::new(SystemTimeProvider)),
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Every state the job passed through, in write order
    pub fn history(&self, id: &str) -> Vec<JobRecord> {
        self.history
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Progress observed while the job was still processing
    pub fn progress_trace(&self, id: &str) -> Vec<f64> {
        self.history(id)
            .into_iter()
            .filter(|r| r.status == JobStatus::Processing)
            .map(|r| r.progress)
            .collect()
    }
}

#[async_trait]
impl JobRegistry for RecordingRegistry {
    async fn create(&self, id: &JobId, method: MethodName) -> Result<()> {
        self.inner.create(id, method).await?;
        if let Some(record) = self.inner.get(id).await? {
            self.history
                .lock()
                .unwrap()
                .entry(id.clone())
                .or_default()
                .push(record);
        }
        Ok(())
    }

    async fn update(&self, id: &JobId, update: JobUpdate) -> Result<JobRecord> {
        let record = self.inner.update(id, update).await?;
        self.history
            .lock()
            .unwrap()
            .entry(id.clone())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn get(&self, id: &JobId) -> Result<Option<JobRecord>> {
        self.inner.get(id).await
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<usize> {
        self.inner.count_by_status(status).await
    }
}

pub struct Harness {
    pub tmp: TempDir,
    pub layout: StorageLayout,
    pub registry: Arc<RecordingRegistry>,
    pub runner: Arc<ScriptedProcessRunner>,
    pub segmenter: Arc<MockSegmenter>,
    pub pipeline: Arc<FramePipeline>,
    pub admission: AdmissionService,
}

impl Harness {
    pub fn new(runner: ScriptedProcessRunner, segmenter: MockSegmenter) -> Self {
        Self::build(runner, segmenter, PipelineConfig::default(), None)
    }

    pub fn build(
        runner: ScriptedProcessRunner,
        segmenter: MockSegmenter,
        config: PipelineConfig,
        accelerator: Option<Arc<dyn AcceleratorDevice>>,
    ) -> Self {
        let tmp = TempDir::new().unwrap();
        let layout = StorageLayout::new(tmp.path().join("temp_videos"));
        let registry = Arc::new(RecordingRegistry::new());
        let runner = Arc::new(runner);
        let segmenter = Arc::new(segmenter);

        let mut pipeline = FramePipeline::new(
            registry.clone(),
            runner.clone(),
            BackendRegistry::new().with_backend(segmenter.clone()),
            layout.clone(),
            config,
        );
        if let Some(device) = accelerator {
            pipeline = pipeline.with_accelerator(AcceleratorPool::new(device));
        }
        let pipeline = Arc::new(pipeline);

        let admission = AdmissionService::new(
            registry.clone(),
            Arc::new(SequentialIdProvider::new("job")),
            pipeline.clone(),
        );

        Self {
            tmp,
            layout,
            registry,
            runner,
            segmenter,
            pipeline,
            admission,
        }
    }

    /// Admit a job and wait for its pipeline to finish
    pub async fn run_job(&self, method: &str) -> JobRecord {
        let admitted = self.admit(method).await;
        admitted.1.await.unwrap();
        self.record(&admitted.0).await
    }

    /// Admit a job without waiting; returns its id and pipeline task
    pub async fn admit(&self, method: &str) -> (JobId, tokio::task::JoinHandle<()>) {
        let mut upload: &[u8] = b"not really a video";
        let admitted = self
            .admission
            .submit(&mut upload, MethodName::new(method))
            .await
            .unwrap();
        (admitted.job_id, admitted.task)
    }

    pub async fn record(&self, id: &str) -> JobRecord {
        self.registry.get(&id.to_string()).await.unwrap().unwrap()
    }
}
