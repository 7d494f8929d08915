//! HTTP API Layer
//!
//! axum server exposing video job admission, status polling, still-image
//! background removal and health.

pub mod error;
pub mod handler;
pub mod rate_limiter;
pub mod server;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use handler::AppServices;
pub use rate_limiter::RateLimiter;
pub use server::{router, HttpServer, HttpServerConfig};
