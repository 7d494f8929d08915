// Backdrop Infrastructure - Storage Adapters
// Implements: JobRegistry (in-memory), Maintenance (working-storage filesystem)

mod job_registry;
mod maintenance_impl;

pub use job_registry::InMemoryJobRegistry;
pub use maintenance_impl::FsMaintenance;
