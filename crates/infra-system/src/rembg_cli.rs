// rembg command-line backend
// Serves the u2net / isnet families and BRIA RMBG through `rembg i -m <model>`

use crate::cli_backend::{load_output, Scratch, ToolInvoker};
use backdrop_core::domain::Method;
use backdrop_core::port::{
    CommandSpec, ProcessRunner, SegmentationBackend, SegmentationError,
};
use image::{DynamicImage, RgbaImage};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

const OUTPUT_FILE: &str = "output.png";

pub struct RembgCliBackend {
    program: String,
    invoker: ToolInvoker,
    timeout: Option<Duration>,
}

impl RembgCliBackend {
    pub fn new(
        program: impl Into<String>,
        runner: Arc<dyn ProcessRunner>,
        handle: Handle,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            program: program.into(),
            invoker: ToolInvoker::new(runner, handle),
            timeout,
        }
    }

    /// rembg model name for `method` (None if rembg cannot serve it)
    pub fn model_for(method: Method) -> Option<&'static str> {
        match method {
            Method::Bria => Some("bria-rmbg"),
            Method::U2net => Some("u2net"),
            Method::U2netHumanSeg => Some("u2net_human_seg"),
            Method::IsnetGeneralUse => Some("isnet-general-use"),
            Method::IsnetAnime => Some("isnet-anime"),
            Method::Inspyrenet => None,
        }
    }
}

impl SegmentationBackend for RembgCliBackend {
    fn name(&self) -> &'static str {
        "rembg"
    }

    fn supports(&self, method: Method) -> bool {
        Self::model_for(method).is_some()
    }

    fn remove_background(
        &self,
        image: DynamicImage,
        method: Method,
    ) -> Result<RgbaImage, SegmentationError> {
        let model = Self::model_for(method).ok_or(SegmentationError::UnsupportedMethod(method))?;

        let scratch = Scratch::stage(&image)?;
        let output = scratch.dir().join(OUTPUT_FILE);
        let spec = CommandSpec::new(&self.program)
            .args(["i", "-m", model])
            .arg(scratch.input().to_string_lossy())
            .arg(output.to_string_lossy())
            .timeout(self.timeout);

        self.invoker.invoke(&spec)?;
        load_output(&output, (image.width(), image.height()))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::cli_backend::test_support::fake_tool;
    use crate::SubprocessRunner;
    use backdrop_core::port::time_provider::SystemTimeProvider;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn backend(program: &std::path::Path) -> RembgCliBackend {
        RembgCliBackend::new(
            program.to_string_lossy(),
            Arc::new(SubprocessRunner::with_default_env(Arc::new(SystemTimeProvider))),
            Handle::current(),
            Some(Duration::from_secs(10)),
        )
    }

    fn frame() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 3, Rgb([1, 2, 3])))
    }

    #[test]
    fn test_model_mapping() {
        assert_eq!(RembgCliBackend::model_for(Method::Bria), Some("bria-rmbg"));
        assert_eq!(
            RembgCliBackend::model_for(Method::IsnetAnime),
            Some("isnet-anime")
        );
        assert_eq!(RembgCliBackend::model_for(Method::Inspyrenet), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_invokes_tool_and_reads_output() {
        let tools = TempDir::new().unwrap();
        // args: i -m <model> <in> <out>
        let tool = fake_tool(tools.path(), "rembg", r#"[ "$3" = "u2net" ] || exit 9; cp "$4" "$5""#);
        let backend = backend(&tool);

        let result = tokio::task::spawn_blocking(move || {
            backend.remove_background(frame(), Method::U2net)
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(result.dimensions(), (5, 3));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tool_failure_is_backend_error() {
        let tools = TempDir::new().unwrap();
        let tool = fake_tool(tools.path(), "rembg", "echo 'model download failed' >&2; exit 1");
        let backend = backend(&tool);

        let result = tokio::task::spawn_blocking(move || {
            backend.remove_background(frame(), Method::IsnetGeneralUse)
        })
        .await
        .unwrap();

        match result {
            Err(SegmentationError::Backend(msg)) => assert!(msg.contains("model download failed")),
            other => panic!("expected backend error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_inspyrenet_is_unsupported() {
        let backend = backend(std::path::Path::new("rembg"));
        let result = tokio::task::spawn_blocking(move || {
            backend.remove_background(frame(), Method::Inspyrenet)
        })
        .await
        .unwrap();

        assert!(matches!(
            result,
            Err(SegmentationError::UnsupportedMethod(Method::Inspyrenet))
        ));
    }
}
