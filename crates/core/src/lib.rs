// Backdrop Core - Domain Logic, Ports & Job Orchestration
// NO adapter dependencies: processes, storage and HTTP live in infra-* / api-* crates

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
