// Backend Registry
// Maps each method to the segmentation backend serving it

use crate::domain::Method;
use crate::port::SegmentationBackend;
use std::sync::Arc;

/// Ordered set of segmentation backends; first match wins
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn SegmentationBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: Arc<dyn SegmentationBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Backend serving `method`, if any
    pub fn resolve(&self, method: Method) -> Option<Arc<dyn SegmentationBackend>> {
        self.backends
            .iter()
            .find(|backend| backend.supports(method))
            .cloned()
    }

    /// Methods with at least one registered backend, in canonical order
    pub fn supported_methods(&self) -> Vec<Method> {
        Method::ALL
            .iter()
            .copied()
            .filter(|method| self.resolve(*method).is_some())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
