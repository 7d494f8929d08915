// Transform Pool
// Bounded offload of blocking per-frame work onto tokio's blocking threads

use super::stage::panic_message;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Transform pool closed")]
    Closed,

    #[error("{0}")]
    Panicked(String),

    #[error("Transform task cancelled")]
    Cancelled,
}

/// Shared pool limiting how many transforms run at once across all jobs
///
/// Cloning is cheap and clones share the same permits.
#[derive(Clone)]
pub struct TransformPool {
    permits: Arc<Semaphore>,
    workers: usize,
}

impl TransformPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `work` on the blocking pool once a permit is free
    ///
    /// The permit is held by the blocking closure itself, so it is returned
    /// only after the work has actually finished (or panicked).
    pub async fn run<F, T>(&self, work: F) -> Result<T, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            work()
        });

        match handle.await {
            Ok(value) => Ok(value),
            Err(join_err) if join_err.is_panic() => {
                Err(PoolError::Panicked(panic_message(join_err.into_panic())))
            }
            Err(_) => Err(PoolError::Cancelled),
        }
    }
}
