//! Backdrop daemon - composition root
//! Wires adapters into the core services and serves HTTP until Ctrl-C

mod config;
mod logging;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{error, info, warn};

use backdrop_api_http::{AppServices, HttpServer, RateLimiter};
use backdrop_core::application::{
    shutdown_channel, AcceleratorPool, AdmissionService, BackendRegistry, FramePipeline,
    RetentionJanitor, StillImageService,
};
use backdrop_core::domain::StorageLayout;
use backdrop_core::port::id_provider::UuidProvider;
use backdrop_core::port::time_provider::SystemTimeProvider;
use backdrop_core::port::{ProcessRunner, TimeProvider};
use backdrop_infra_store::{FsMaintenance, InMemoryJobRegistry};
use backdrop_infra_system::{CudaDevice, InspyrenetCliBackend, RembgCliBackend, SubprocessRunner};
use config::DaemonConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration (.env is optional)
    let _ = dotenvy::dotenv();
    let config = DaemonConfig::from_env()?;

    // 2. Logging
    let _log_guard = logging::init(config.log_format, config.log_dir.as_deref())?;
    info!("Backdrop daemon v{} starting...", VERSION);

    // 3. Working storage
    let layout = StorageLayout::new(config.storage_dir.clone());
    layout
        .ensure()
        .await
        .with_context(|| format!("Cannot prepare storage at {}", config.storage_dir.display()))?;
    info!(storage_dir = %config.storage_dir.display(), "Working storage ready");

    // 4. Adapters (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let registry = Arc::new(InMemoryJobRegistry::new(time_provider.clone()));
    let runner: Arc<dyn ProcessRunner> =
        Arc::new(SubprocessRunner::new(time_provider.clone(), config.tool_env.clone()));

    let device_name = config
        .accelerator
        .clone()
        .unwrap_or_else(|| "cpu".to_string());
    let device = Arc::new(CudaDevice::new(device_name));

    let tool_timeout = config.pipeline.tool_timeout;
    let backends = BackendRegistry::new()
        .with_backend(Arc::new(RembgCliBackend::new(
            config.rembg_program.clone(),
            runner.clone(),
            Handle::current(),
            tool_timeout,
        )))
        .with_backend(Arc::new(InspyrenetCliBackend::new(
            config.inspyrenet_program.clone(),
            runner.clone(),
            Handle::current(),
            device.clone(),
            tool_timeout,
        )));
    info!(methods = ?backends.supported_methods(), "Segmentation backends registered");

    // 5. Core services
    let mut pipeline = FramePipeline::new(
        registry.clone(),
        runner,
        backends,
        layout.clone(),
        config.pipeline.clone(),
    );
    if config.accelerator.is_some() {
        pipeline = pipeline.with_accelerator(AcceleratorPool::new(device));
    } else {
        warn!("No accelerator configured, accelerator-bound methods run unserialized");
    }
    let pipeline = Arc::new(pipeline);

    let services = AppServices {
        admission: Arc::new(AdmissionService::new(
            registry.clone(),
            Arc::new(UuidProvider),
            pipeline.clone(),
        )),
        registry: registry.clone(),
        still_images: Arc::new(StillImageService::sharing(&pipeline)),
        admission_limiter: Arc::new(RateLimiter::new(
            config.http.rate_limit_burst,
            config.http.rate_limit_rate,
        )),
    };

    // 6. Retention janitor
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let maintenance = Arc::new(FsMaintenance::new(layout, time_provider));
    let janitor = RetentionJanitor::new(maintenance, config.maintenance.clone());
    let janitor_handle = tokio::spawn(janitor.run(shutdown_tx.token()));

    // 7. HTTP server
    let server = HttpServer::new(config.http.clone(), services);
    let mut server_handle = tokio::spawn(server.serve(shutdown_rx));

    info!(addr = %config.http.addr(), "System ready. Press Ctrl+C to shutdown");

    // 8. Wait for Ctrl-C or an early server exit
    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Shutdown signal received. Exiting gracefully...");
        }
        exited = &mut server_handle => {
            shutdown_tx.shutdown();
            let _ = tokio::time::timeout(SHUTDOWN_GRACE, janitor_handle).await;
            return match exited {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e).context("HTTP server failed"),
                Err(e) => Err(e).context("HTTP server task panicked"),
            };
        }
    }

    // 9. Graceful shutdown
    shutdown_tx.shutdown();
    match tokio::time::timeout(SHUTDOWN_GRACE, server_handle).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => error!(error = %e, "HTTP server stopped with an error"),
        Ok(Err(e)) => error!(error = %e, "HTTP server task panicked"),
        Err(_) => warn!("HTTP server did not drain in time"),
    }
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, janitor_handle).await;

    info!("Shutdown complete.");
    Ok(())
}
