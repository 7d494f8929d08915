// Shared accelerator handle for models that run out of process

use backdrop_core::domain::Method;
use backdrop_core::port::AcceleratorDevice;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// A CUDA device that command-line models are pointed at while attached
///
/// The device itself is not opened here; attaching only records that the
/// current lease holder may run its model on it. Detached, tools run on CPU.
pub struct CudaDevice {
    name: String,
    attached: AtomicBool,
}

impl CudaDevice {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attached: AtomicBool::new(false),
        }
    }

    /// Device argument a tool should use right now
    pub fn current_target(&self) -> &str {
        if self.is_attached() {
            &self.name
        } else {
            "cpu"
        }
    }
}

impl AcceleratorDevice for CudaDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn attach(&self, method: Method) {
        self.attached.store(true, Ordering::SeqCst);
        info!(device = %self.name, method = %method, "Model moved to accelerator");
    }

    fn release(&self) {
        self.attached.store(false, Ordering::SeqCst);
        info!(device = %self.name, "Accelerator returned to idle");
    }

    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }
}
