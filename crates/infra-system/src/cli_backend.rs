// Shared plumbing for segmentation backends that shell out to a CLI tool

use backdrop_core::port::{CommandSpec, ProcessRunner, SegmentationError};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::runtime::Handle;

/// Input file name inside the scratch directory
pub(crate) const INPUT_FILE: &str = "input.png";

/// Scratch directory holding one staged input image
pub(crate) struct Scratch {
    dir: TempDir,
    input: PathBuf,
}

impl Scratch {
    pub(crate) fn stage(image: &DynamicImage) -> Result<Self, SegmentationError> {
        let dir = tempfile::Builder::new().prefix("backdrop-seg-").tempdir()?;
        let input = dir.path().join(INPUT_FILE);
        image
            .save_with_format(&input, ImageFormat::Png)
            .map_err(|e| SegmentationError::Backend(format!("failed to stage input: {}", e)))?;
        Ok(Self { dir, input })
    }

    pub(crate) fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub(crate) fn input(&self) -> &Path {
        &self.input
    }
}

/// Runs tool invocations from blocking threads on the async runtime's runner
#[derive(Clone)]
pub(crate) struct ToolInvoker {
    runner: Arc<dyn ProcessRunner>,
    handle: Handle,
}

impl ToolInvoker {
    pub(crate) fn new(runner: Arc<dyn ProcessRunner>, handle: Handle) -> Self {
        Self { runner, handle }
    }

    /// Run `spec` to completion; must be called off the async workers
    pub(crate) fn invoke(&self, spec: &CommandSpec) -> Result<(), SegmentationError> {
        let result = self
            .handle
            .block_on(self.runner.run(spec))
            .map_err(|e| SegmentationError::Backend(e.to_string()))?;

        if !result.is_success() {
            return Err(SegmentationError::Backend(format!(
                "{} exited with {:?}: {}",
                spec.program,
                result.exit_code,
                result.stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Load the tool's output and check it still matches the input geometry
pub(crate) fn load_output(
    path: &Path,
    expected: (u32, u32),
) -> Result<RgbaImage, SegmentationError> {
    if !path.is_file() {
        return Err(SegmentationError::Backend(format!(
            "tool produced no output at {}",
            path.display()
        )));
    }

    let rgba = image::open(path)?.to_rgba8();
    if rgba.dimensions() != expected {
        return Err(SegmentationError::Backend(format!(
            "output is {:?}, expected {:?}",
            rgba.dimensions(),
            expected
        )));
    }
    Ok(rgba)
}
