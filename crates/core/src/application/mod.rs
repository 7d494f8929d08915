// Application Layer - Use Cases and Business Logic

pub mod admission;
pub mod maintenance;
pub mod pipeline;
pub mod shutdown;
pub mod status;
pub mod still_image;

// Re-exports
pub use admission::{AdmissionService, AdmittedJob, StagedUpload};
pub use maintenance::RetentionJanitor;
pub use pipeline::{
    AcceleratorLease, AcceleratorPool, BackendRegistry, FramePipeline, PipelineConfig,
    StageError, ToolPaths, TransformPool,
};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use status::{query_status, JobSnapshot, StatusView};
pub use still_image::StillImageService;
