// Domain Layer - Pure business logic and entities

pub mod error;
pub mod job;
pub mod method;
pub mod storage;

// Re-exports
pub use error::DomainError;
pub use job::{JobId, JobRecord, JobStatus, JobUpdate, MethodName, Stage};
pub use method::Method;
pub use storage::StorageLayout;
