// Frame Pipeline - drives one video job from admission to a terminal state

pub mod accelerator;
pub mod backends;
pub mod commands;
pub mod config;
pub mod constants;
pub mod frames;
mod stage;
mod transform_pool;

pub use accelerator::{AcceleratorLease, AcceleratorPool};
pub use backends::BackendRegistry;
pub use config::{PipelineConfig, ToolPaths};
pub use stage::StageError;
pub use transform_pool::{PoolError, TransformPool};

use crate::domain::{JobId, JobUpdate, Method, MethodName, Stage, StorageLayout};
use crate::error::AppError;
use crate::port::{
    CommandSpec, ExecutionResult, JobRegistry, ProcessRunner, SegmentationBackend,
    SegmentationError,
};
use image::ImageFormat;
use stage::panic_message;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Frame pipeline orchestrator
///
/// One `run` call per admitted job. Stages execute strictly in order:
/// counting_frames -> extracting -> transforming -> encoding. Every outcome,
/// including a panic inside a stage, ends with the frame directory removed and
/// a terminal status on the job record.
pub struct FramePipeline {
    registry: Arc<dyn JobRegistry>,
    runner: Arc<dyn ProcessRunner>,
    backends: BackendRegistry,
    transform_pool: TransformPool,
    accelerator: Option<AcceleratorPool>,
    layout: StorageLayout,
    config: PipelineConfig,
}

impl FramePipeline {
    pub fn new(
        registry: Arc<dyn JobRegistry>,
        runner: Arc<dyn ProcessRunner>,
        backends: BackendRegistry,
        layout: StorageLayout,
        config: PipelineConfig,
    ) -> Self {
        Self {
            registry,
            runner,
            backends,
            transform_pool: TransformPool::new(config.transform_workers),
            accelerator: None,
            layout,
            config,
        }
    }

    /// Serialize accelerator-bound methods through `pool`
    ///
    /// Without a pool those methods still run, just without a device lease.
    pub fn with_accelerator(mut self, pool: AcceleratorPool) -> Self {
        self.accelerator = Some(pool);
        self
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    pub fn transform_pool(&self) -> &TransformPool {
        &self.transform_pool
    }

    pub fn accelerator(&self) -> Option<&AcceleratorPool> {
        self.accelerator.as_ref()
    }

    /// Drive `job_id` to completion or error. Never fails, never panics outward.
    pub async fn run(self: Arc<Self>, job_id: JobId, method: MethodName) {
        let started = Instant::now();
        info!(job_id = %job_id, method = %method, "Pipeline started");

        // Stages run in their own task so a panic surfaces as a JoinError
        let stages = {
            let pipeline = Arc::clone(&self);
            let job_id = job_id.clone();
            tokio::spawn(async move { pipeline.execute_stages(&job_id, &method).await })
        };

        let outcome = match stages.await {
            Ok(outcome) => outcome,
            Err(join_err) if join_err.is_panic() => {
                let msg = panic_message(join_err.into_panic());
                error!(job_id = %job_id, panic_msg = %msg, "Pipeline panicked");
                Err(StageError::Unexpected(msg))
            }
            Err(join_err) => Err(StageError::Unexpected(join_err.to_string())),
        };

        // Cleanup precedes the terminal update: a terminal job never has frames on disk
        let frame_dir = self.layout.frame_dir(&job_id);
        if let Err(e) = frames::remove_dir_if_exists(&frame_dir).await {
            warn!(job_id = %job_id, dir = %frame_dir.display(), error = %e, "Failed to remove frame directory");
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let update = match outcome {
            Ok(output_path) => {
                info!(job_id = %job_id, output = %output_path.display(), elapsed_ms, "Job completed");
                JobUpdate::Completed { output_path }
            }
            Err(e) => {
                warn!(
                    job_id = %job_id,
                    stage = ?e.stage(),
                    detail = e.detail().unwrap_or_default(),
                    elapsed_ms,
                    "Job failed: {}",
                    e
                );
                JobUpdate::Failed { message: e.message() }
            }
        };

        if let Err(e) = self.registry.update(&job_id, update).await {
            error!(job_id = %job_id, error = %e, "Failed to record terminal status");
        }
    }

    async fn execute_stages(
        &self,
        job_id: &JobId,
        method_name: &MethodName,
    ) -> Result<PathBuf, StageError> {
        let invalid = || StageError::InvalidMethod(method_name.to_string());
        let method: Method = method_name.as_str().parse().map_err(|_| invalid())?;
        let backend = self.backends.resolve(method).ok_or_else(invalid)?;

        // counting_frames
        self.advance(job_id, Stage::CountingFrames).await?;
        let input = self.layout.input_path(job_id);
        let total = self.count_frames(&input).await?;
        if total > self.config.max_frames {
            return Err(StageError::TooLong {
                frames: total,
                max: self.config.max_frames,
            });
        }

        // extracting
        self.advance(job_id, Stage::Extracting).await?;
        let frame_dir = self.layout.frame_dir(job_id);
        let frame_files = self.extract_frames(&input, &frame_dir).await?;
        if frame_files.len() as u32 != total {
            warn!(job_id = %job_id, probed = total, extracted = frame_files.len(), "Probe and extraction disagree");
        }

        // transforming
        self.advance(job_id, Stage::Transforming).await?;
        self.transform_frames(job_id, method, backend, frame_files)
            .await?;

        // encoding
        self.advance(job_id, Stage::Encoding).await?;
        let output = self.layout.output_path(job_id);
        self.encode_video(&frame_dir, &output).await?;

        Ok(output)
    }

    async fn advance(&self, job_id: &JobId, stage: Stage) -> Result<(), StageError> {
        debug!(job_id = %job_id, stage = %stage, "Stage started");
        self.registry
            .update(
                job_id,
                JobUpdate::Stage {
                    stage,
                    message: stage.description().to_string(),
                },
            )
            .await
            .map(|_| ())
            .map_err(registry_failure)
    }

    async fn count_frames(&self, input: &Path) -> Result<u32, StageError> {
        let spec = commands::probe_frames(&self.config, input);
        let result = self
            .run_tool(&spec)
            .await
            .map_err(|detail| StageError::CountFailed { detail })?;

        commands::parse_frame_count(&result.stdout).ok_or_else(|| StageError::CountFailed {
            detail: format!("unparsable probe output: {:?}", result.stdout.trim()),
        })
    }

    async fn extract_frames(
        &self,
        input: &Path,
        frame_dir: &Path,
    ) -> Result<Vec<PathBuf>, StageError> {
        let io_failure = |e: std::io::Error| StageError::ExtractFailed {
            detail: e.to_string(),
        };

        frames::create_fresh_dir(frame_dir)
            .await
            .map_err(io_failure)?;

        let spec = commands::extract_frames(&self.config, input, frame_dir);
        self.run_tool(&spec)
            .await
            .map_err(|detail| StageError::ExtractFailed { detail })?;

        let frame_files = frames::list_frames(frame_dir).await.map_err(io_failure)?;
        if frame_files.is_empty() {
            return Err(StageError::NoFrames);
        }
        Ok(frame_files)
    }

    async fn transform_frames(
        &self,
        job_id: &JobId,
        method: Method,
        backend: Arc<dyn SegmentationBackend>,
        frame_files: Vec<PathBuf>,
    ) -> Result<(), StageError> {
        // Held for the whole stage; dropped on every exit path below
        let _lease = match (&self.accelerator, method.requires_accelerator()) {
            (Some(pool), true) => Some(pool.acquire(method).await.map_err(registry_failure)?),
            _ => None,
        };

        let total = frame_files.len();
        for (done, frame) in frame_files.into_iter().enumerate() {
            let worker_backend = Arc::clone(&backend);
            let frame_name = frame
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            self.transform_pool
                .run(move || transform_frame(worker_backend.as_ref(), &frame, method))
                .await
                .map_err(|e| match e {
                    PoolError::Panicked(msg) => StageError::Unexpected(msg),
                    other => StageError::Unexpected(other.to_string()),
                })?
                .map_err(|e| {
                    debug!(job_id = %job_id, frame = %frame_name, error = %e, "Frame transform failed");
                    StageError::TransformFailed(e.to_string())
                })?;

            let progress = (done + 1) as f64 / total as f64 * 100.0;
            self.registry
                .update(job_id, JobUpdate::Progress(progress))
                .await
                .map_err(registry_failure)?;
        }

        Ok(())
    }

    async fn encode_video(&self, frame_dir: &Path, output: &Path) -> Result<(), StageError> {
        let spec = commands::encode_video(&self.config, frame_dir, output);
        self.run_tool(&spec)
            .await
            .map_err(|detail| StageError::EncodeFailed { detail })?;

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.is_file() => Ok(()),
            _ => Err(StageError::EncodeFailed {
                detail: format!("encoder wrote no file at {}", output.display()),
            }),
        }
    }

    /// Run a tool, turning spawn errors and non-zero exits into a diagnostic string
    async fn run_tool(&self, spec: &CommandSpec) -> Result<ExecutionResult, String> {
        debug!(command = %spec, "Running tool");
        let result = self.runner.run(spec).await.map_err(|e| e.to_string())?;

        if !result.is_success() {
            let stderr = result.stderr.trim();
            return Err(format!(
                "{} exited with {:?}: {}",
                spec.program, result.exit_code, stderr
            ));
        }
        Ok(result)
    }
}

/// Decode one frame, remove its background, overwrite it in place as PNG
fn transform_frame(
    backend: &dyn SegmentationBackend,
    frame: &Path,
    method: Method,
) -> Result<(), SegmentationError> {
    let decoded = image::open(frame)?;
    let rgb = image::DynamicImage::ImageRgb8(decoded.to_rgb8());
    let rgba = backend.remove_background(rgb, method)?;
    rgba.save_with_format(frame, ImageFormat::Png)
        .map_err(|e| SegmentationError::Backend(format!("failed to write frame: {}", e)))
}

fn registry_failure(err: AppError) -> StageError {
    StageError::Unexpected(err.to_string())
}
