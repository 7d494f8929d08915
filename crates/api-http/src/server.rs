//! HTTP Server
//!
//! Router assembly and the serve loop with graceful shutdown.

use crate::handler::{self, AppServices};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use backdrop_core::application::ShutdownToken;
use std::io;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 9876;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;
const DEFAULT_RATE_LIMIT_BURST: u32 = 20;
const DEFAULT_RATE_LIMIT_RATE: u32 = 5;

/// HTTP Server Configuration
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    /// Video admissions allowed back to back
    pub rate_limit_burst: u32,
    /// Video admissions per second once the burst is spent
    pub rate_limit_rate: u32,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            rate_limit_burst: DEFAULT_RATE_LIMIT_BURST,
            rate_limit_rate: DEFAULT_RATE_LIMIT_RATE,
        }
    }
}

impl HttpServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Build the application router
pub fn router(services: AppServices, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/remove_background_video/", post(handler::submit_video))
        .route("/status/:job_id", get(handler::job_status))
        .route("/remove_background/", post(handler::remove_background_image))
        .route("/health", get(handler::health))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(services)
}

pub struct HttpServer {
    config: HttpServerConfig,
    services: AppServices,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, services: AppServices) -> Self {
        Self { config, services }
    }

    /// Bind and serve until `shutdown` fires; in-flight requests are drained
    pub async fn serve(self, shutdown: ShutdownToken) -> io::Result<()> {
        let listener = TcpListener::bind(self.config.addr()).await?;
        self.serve_on(listener, shutdown).await
    }

    pub async fn serve_on(self, listener: TcpListener, mut shutdown: ShutdownToken) -> io::Result<()> {
        info!(
            addr = %listener.local_addr()?,
            max_upload_bytes = self.config.max_upload_bytes,
            "HTTP server listening"
        );

        let app = router(self.services, self.config.max_upload_bytes);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}
