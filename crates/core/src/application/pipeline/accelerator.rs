// Accelerator Pool
// One shared device, one holder at a time, released when the lease drops

use crate::domain::Method;
use crate::error::{AppError, Result};
use crate::port::AcceleratorDevice;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Exclusive access to the shared accelerator
#[derive(Clone)]
pub struct AcceleratorPool {
    device: Arc<dyn AcceleratorDevice>,
    permit: Arc<Semaphore>,
}

impl AcceleratorPool {
    pub fn new(device: Arc<dyn AcceleratorDevice>) -> Self {
        Self {
            device,
            permit: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn device_name(&self) -> &str {
        self.device.name()
    }

    /// Wait for the device, then attach the model serving `method`
    pub async fn acquire(&self, method: Method) -> Result<AcceleratorLease> {
        let permit = Arc::clone(&self.permit)
            .acquire_owned()
            .await
            .map_err(|_| AppError::Internal("accelerator pool closed".to_string()))?;

        self.device.attach(method);
        debug!(device = %self.device.name(), method = %method, "Accelerator attached");

        Ok(AcceleratorLease {
            device: Arc::clone(&self.device),
            _permit: permit,
        })
    }
}

/// Scoped hold on the accelerator
///
/// Dropping the lease releases the device before the permit is returned, so
/// the next holder always finds it idle.
pub struct AcceleratorLease {
    device: Arc<dyn AcceleratorDevice>,
    _permit: OwnedSemaphorePermit,
}

impl Drop for AcceleratorLease {
    fn drop(&mut self) {
        self.device.release();
        debug!(device = %self.device.name(), "Accelerator released");
    }
}
