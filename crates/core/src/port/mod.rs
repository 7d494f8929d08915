// Port Layer - Interfaces for external dependencies

pub mod accelerator;
pub mod id_provider; // For deterministic testing
pub mod job_registry;
pub mod maintenance;
pub mod process_runner;
pub mod segmentation;
pub mod time_provider;

// Re-exports
pub use accelerator::AcceleratorDevice;
pub use id_provider::IdProvider;
pub use job_registry::JobRegistry;
pub use maintenance::{Maintenance, MaintenanceConfig, StorageStats, SweepStats};
pub use process_runner::{
    CommandSpec, ExecutionError, ExecutionResult, ExecutionStatus, ProcessRunner,
};
pub use segmentation::{SegmentationBackend, SegmentationError};
pub use time_provider::TimeProvider;
