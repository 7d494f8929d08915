// Backdrop Infrastructure - System Adapters
// Implements: ProcessRunner, SegmentationBackend (rembg, transparent-background), AcceleratorDevice

mod cli_backend;
pub mod cuda_device;
pub mod inspyrenet_cli;
pub mod rembg_cli;
pub mod subprocess_runner;

pub use cuda_device::CudaDevice;
pub use inspyrenet_cli::InspyrenetCliBackend;
pub use rembg_cli::RembgCliBackend;
pub use subprocess_runner::{SubprocessRunner, DEFAULT_ENV_ALLOWLIST};
