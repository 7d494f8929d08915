// Segmentation Backend Port
// Pluggable background removal for a single image

use crate::domain::Method;
use image::{DynamicImage, RgbaImage};
use thiserror::Error;

/// Segmentation errors
#[derive(Error, Debug)]
pub enum SegmentationError {
    #[error("Method {0} is not supported by this backend")]
    UnsupportedMethod(Method),

    #[error("Image decode failed: {0}")]
    Decode(String),

    #[error("Backend failed: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for SegmentationError {
    fn from(err: image::ImageError) -> Self {
        SegmentationError::Decode(err.to_string())
    }
}

/// Segmentation backend trait
///
/// Calls are synchronous and may block for a long time; callers run them on the
/// blocking pool. Each call is independent: no state is carried between calls
/// beyond model warm-up.
pub trait SegmentationBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Whether this backend can serve `method`
    fn supports(&self, method: Method) -> bool;

    /// Return `image` with its background made transparent
    ///
    /// # Errors
    /// - SegmentationError::UnsupportedMethod if `supports(method)` is false
    /// - SegmentationError::Backend if the model or tool fails
    fn remove_background(
        &self,
        image: DynamicImage,
        method: Method,
    ) -> Result<RgbaImage, SegmentationError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use image::Rgba;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Mock behaviour
    #[derive(Debug, Clone)]
    pub enum MockSegmenterBehavior {
        /// Clear the alpha channel of every pixel
        Transparent,
        /// Fail on the n-th call (1-based)
        FailOnCall(usize),
        /// Panic on the n-th call (for panic isolation testing)
        PanicOnCall(usize),
    }

    /// Mock segmentation backend supporting every method
    pub struct MockSegmenter {
        behavior: MockSegmenterBehavior,
        delay: Option<Duration>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        methods: Mutex<Vec<Method>>,
    }

    impl MockSegmenter {
        pub fn new(behavior: MockSegmenterBehavior) -> Self {
            Self {
                behavior,
                delay: None,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                methods: Mutex::new(Vec::new()),
            }
        }

        pub fn transparent() -> Self {
            Self::new(MockSegmenterBehavior::Transparent)
        }

        /// Block the calling thread for `delay` on every call
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Highest number of calls observed running at the same time
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        pub fn methods_seen(&self) -> Vec<Method> {
            self.methods.lock().unwrap().clone()
        }
    }

    impl SegmentationBackend for MockSegmenter {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn supports(&self, _method: Method) -> bool {
            true
        }

        fn remove_background(
            &self,
            image: DynamicImage,
            method: Method,
        ) -> Result<RgbaImage, SegmentationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.methods.lock().unwrap().push(method);

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match &self.behavior {
                MockSegmenterBehavior::FailOnCall(n) if *n == call => Err(
                    SegmentationError::Backend(format!("mock failure on call {}", call)),
                ),
                MockSegmenterBehavior::PanicOnCall(n) if *n == call => {
                    panic!("mock segmenter panic on call {}", call);
                }
                _ => {
                    let mut rgba = image.to_rgba8();
                    for pixel in rgba.pixels_mut() {
                        *pixel = Rgba([pixel[0], pixel[1], pixel[2], 0]);
                    }
                    Ok(rgba)
                }
            }
        }
    }
}
