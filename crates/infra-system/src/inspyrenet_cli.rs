// InSPyReNet backend via the `transparent-background` command-line tool

use crate::cli_backend::{load_output, Scratch, ToolInvoker, INPUT_FILE};
use crate::cuda_device::CudaDevice;
use backdrop_core::domain::Method;
use backdrop_core::port::{
    CommandSpec, ProcessRunner, SegmentationBackend, SegmentationError,
};
use image::{DynamicImage, RgbaImage};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

pub struct InspyrenetCliBackend {
    program: String,
    invoker: ToolInvoker,
    device: Arc<CudaDevice>,
    timeout: Option<Duration>,
}

impl InspyrenetCliBackend {
    pub fn new(
        program: impl Into<String>,
        runner: Arc<dyn ProcessRunner>,
        handle: Handle,
        device: Arc<CudaDevice>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            program: program.into(),
            invoker: ToolInvoker::new(runner, handle),
            device,
            timeout,
        }
    }

    /// transparent-background writes `<stem>_rgba.png` into the destination directory
    fn output_path(dest: &Path) -> std::path::PathBuf {
        let stem = Path::new(INPUT_FILE)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        dest.join(format!("{}_rgba.png", stem))
    }
}

impl SegmentationBackend for InspyrenetCliBackend {
    fn name(&self) -> &'static str {
        "transparent-background"
    }

    fn supports(&self, method: Method) -> bool {
        method == Method::Inspyrenet
    }

    fn remove_background(
        &self,
        image: DynamicImage,
        method: Method,
    ) -> Result<RgbaImage, SegmentationError> {
        if !self.supports(method) {
            return Err(SegmentationError::UnsupportedMethod(method));
        }

        let scratch = Scratch::stage(&image)?;
        let spec = CommandSpec::new(&self.program)
            .arg("--source")
            .arg(scratch.input().to_string_lossy())
            .arg("--dest")
            .arg(scratch.dir().to_string_lossy())
            .args(["--type", "rgba", "--device", self.device.current_target()])
            .timeout(self.timeout);

        self.invoker.invoke(&spec)?;
        load_output(
            &Self::output_path(scratch.dir()),
            (image.width(), image.height()),
        )
    }
}
