// Accelerator Device Port
// A single shared compute device (GPU) that accelerator-bound models move onto

use crate::domain::Method;

/// Shared accelerator device handle
///
/// `attach` and `release` are called by the application layer's lease and are
/// always paired, including on failure paths.
pub trait AcceleratorDevice: Send + Sync {
    /// Device identifier for logs (e.g. "cuda:0")
    fn name(&self) -> &str;

    /// Move the model serving `method` onto the device
    fn attach(&self, method: Method);

    /// Return the device to idle and free cached memory
    fn release(&self);

    /// Whether a model currently occupies the device
    fn is_attached(&self) -> bool;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Mock device counting attach / release pairs
    #[derive(Default)]
    pub struct MockAccelerator {
        attached: AtomicBool,
        attaches: AtomicUsize,
        releases: AtomicUsize,
    }

    impl MockAccelerator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn attach_count(&self) -> usize {
            self.attaches.load(Ordering::SeqCst)
        }

        pub fn release_count(&self) -> usize {
            self.releases.load(Ordering::SeqCst)
        }
    }

    impl AcceleratorDevice for MockAccelerator {
        fn name(&self) -> &str {
            "mock:0"
        }

        fn attach(&self, _method: Method) {
            let was_attached = self.attached.swap(true, Ordering::SeqCst);
            assert!(!was_attached, "accelerator attached twice without release");
            self.attaches.fetch_add(1, Ordering::SeqCst);
        }

        fn release(&self) {
            self.attached.store(false, Ordering::SeqCst);
            self.releases.fetch_add(1, Ordering::SeqCst);
        }

        fn is_attached(&self) -> bool {
            self.attached.load(Ordering::SeqCst)
        }
    }
}
