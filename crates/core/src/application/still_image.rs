// Still Image Use Case
// Synchronous single-image background removal, sharing the pipeline's pools

use super::pipeline::{AcceleratorPool, BackendRegistry, FramePipeline, PoolError, TransformPool};
use crate::domain::Method;
use crate::error::{AppError, Result};
use image::ImageFormat;
use std::io::Cursor;
use std::time::Instant;
use tracing::info;

pub struct StillImageService {
    backends: BackendRegistry,
    transform_pool: TransformPool,
    accelerator: Option<AcceleratorPool>,
}

impl StillImageService {
    pub fn new(
        backends: BackendRegistry,
        transform_pool: TransformPool,
        accelerator: Option<AcceleratorPool>,
    ) -> Self {
        Self {
            backends,
            transform_pool,
            accelerator,
        }
    }

    /// Share backends, workers and accelerator with a video pipeline
    pub fn sharing(pipeline: &FramePipeline) -> Self {
        Self::new(
            pipeline.backends().clone(),
            pipeline.transform_pool().clone(),
            pipeline.accelerator().cloned(),
        )
    }

    /// Remove the background of an encoded image, returning PNG bytes
    ///
    /// # Errors
    /// - AppError::Validation for an unknown method or undecodable image
    /// - AppError::Segmentation if the backend fails
    pub async fn remove_background(&self, bytes: Vec<u8>, method: &str) -> Result<Vec<u8>> {
        let method: Method = method
            .parse()
            .map_err(|_| AppError::Validation("Invalid method".to_string()))?;
        let backend = self
            .backends
            .resolve(method)
            .ok_or_else(|| AppError::Validation("Invalid method".to_string()))?;

        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| AppError::Validation(format!("Unreadable image: {}", e)))?;
        let rgb = image::DynamicImage::ImageRgb8(decoded.to_rgb8());

        let started = Instant::now();
        let _lease = match (&self.accelerator, method.requires_accelerator()) {
            (Some(pool), true) => Some(pool.acquire(method).await?),
            _ => None,
        };

        let png = self
            .transform_pool
            .run(move || -> Result<Vec<u8>> {
                let rgba = backend.remove_background(rgb, method)?;
                let mut out = Cursor::new(Vec::new());
                rgba.write_to(&mut out, ImageFormat::Png)
                    .map_err(|e| AppError::Internal(format!("PNG encoding failed: {}", e)))?;
                Ok(out.into_inner())
            })
            .await
            .map_err(|e: PoolError| AppError::Internal(e.to_string()))??;

        info!(
            method = %method,
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = png.len(),
            "Still image processed"
        );
        Ok(png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::accelerator::mocks::MockAccelerator;
    use crate::port::segmentation::mocks::MockSegmenter;
    use crate::port::AcceleratorDevice;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::sync::Arc;

    fn png_bytes() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, Rgb([10, 20, 30])));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn service(accelerator: Option<AcceleratorPool>) -> StillImageService {
        StillImageService::new(
            BackendRegistry::new().with_backend(Arc::new(MockSegmenter::transparent())),
            TransformPool::new(1),
            accelerator,
        )
    }

    #[tokio::test]
    async fn test_returns_transparent_png() {
        let png = service(None)
            .remove_background(png_bytes(), "u2net")
            .await
            .unwrap();

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        assert!(decoded.pixels().all(|p| p[3] == 0));
    }

    #[tokio::test]
    async fn test_unknown_method_is_validation_error() {
        let result = service(None).remove_background(png_bytes(), "sam").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_garbage_bytes_are_validation_error() {
        let result = service(None)
            .remove_background(b"not an image".to_vec(), "u2net")
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_accelerator_method_leases_device() {
        let device = Arc::new(MockAccelerator::new());
        let service = service(Some(AcceleratorPool::new(device.clone())));

        service
            .remove_background(png_bytes(), "inspyrenet")
            .await
            .unwrap();
        service.remove_background(png_bytes(), "u2net").await.unwrap();

        assert_eq!(device.attach_count(), 1);
        assert_eq!(device.release_count(), 1);
        assert!(!device.is_attached());
    }
}
