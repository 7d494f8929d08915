// Process Runner Port
// Abstraction for running external media tools as isolated child processes

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// External command to run: program, arguments, optional deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Value following `flag` in the argument list
    pub fn arg_after(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Result of a finished process
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub duration_ms: i64,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

/// Execution status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    /// Exited with a non-zero code or was killed by a signal
    Failed,
}

/// Execution errors (the process never produced an exit status)
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Process timeout after {0}ms")]
    Timeout(u64),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Process Runner trait
///
/// Implementations:
/// - SubprocessRunner (infra-system): tokio child processes
/// - ScriptedProcessRunner (mocks): canned ffprobe/ffmpeg behaviour
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run a command to completion, capturing stdout and stderr
    ///
    /// A non-zero exit is reported as `ExecutionStatus::Failed`, not as an error.
    ///
    /// # Errors
    /// - ExecutionError::SpawnFailed if the program cannot be started
    /// - ExecutionError::Timeout if it outlives `spec.timeout`
    async fn run(&self, spec: &CommandSpec) -> Result<ExecutionResult, ExecutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::path::Path;
    use std::sync::Mutex;

    /// Behaviour of the frame-count probe
    #[derive(Debug, Clone)]
    pub enum ProbeScript {
        /// Print this many frames
        Frames(u32),
        /// Print raw stdout (for parse failures)
        Output(String),
        /// Exit with a non-zero code
        ExitCode(i32),
        /// Fail to spawn
        SpawnError,
    }

    /// Behaviour of frame extraction
    #[derive(Debug, Clone)]
    pub enum ExtractScript {
        /// Write this many frame files
        Frames(u32),
        ExitCode(i32),
    }

    /// Behaviour of the encoder
    #[derive(Debug, Clone)]
    pub enum EncodeScript {
        /// Write an artifact recording the number of input frames
        Succeed,
        ExitCode(i32),
    }

    /// One frame as the encoder read it from disk
    #[derive(Debug, Clone, PartialEq)]
    pub struct EncodedFrame {
        /// 1-based index from the `frame_%05d.png` pattern
        pub index: u32,
        pub has_alpha: bool,
        pub max_alpha: u8,
    }

    /// Mock runner that imitates ffprobe / ffmpeg side effects on disk
    pub struct ScriptedProcessRunner {
        probe: ProbeScript,
        extract: ExtractScript,
        encode: EncodeScript,
        delay: Option<Duration>,
        calls: Mutex<Vec<CommandSpec>>,
        encoded: Mutex<Vec<(String, Vec<EncodedFrame>)>>,
    }

    impl ScriptedProcessRunner {
        pub fn new(probe: ProbeScript, extract: ExtractScript, encode: EncodeScript) -> Self {
            Self {
                probe,
                extract,
                encode,
                delay: None,
                calls: Mutex::new(Vec::new()),
                encoded: Mutex::new(Vec::new()),
            }
        }

        /// Every stage succeeds for a video of `frames` frames
        pub fn for_frames(frames: u32) -> Self {
            Self::new(
                ProbeScript::Frames(frames),
                ExtractScript::Frames(frames),
                EncodeScript::Succeed,
            )
        }

        /// Sleep before each command (to interleave concurrent jobs)
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }

        /// Frames consumed by the encode that produced `output`, in read order
        pub fn encoded_frames(&self, output: impl AsRef<Path>) -> Vec<EncodedFrame> {
            let output = output.as_ref().to_string_lossy();
            self.encoded
                .lock()
                .unwrap()
                .iter()
                .find(|(path, _)| *path == output)
                .map(|(_, frames)| frames.clone())
                .unwrap_or_default()
        }

        fn failed(code: i32, stderr: &str) -> ExecutionResult {
            ExecutionResult {
                status: ExecutionStatus::Failed,
                duration_ms: 1,
                exit_code: Some(code),
                stdout: String::new(),
                stderr: stderr.to_string(),
            }
        }

        fn succeeded(stdout: impl Into<String>) -> ExecutionResult {
            ExecutionResult {
                status: ExecutionStatus::Success,
                duration_ms: 1,
                exit_code: Some(0),
                stdout: stdout.into(),
                stderr: String::new(),
            }
        }

        fn write_frames(pattern: &str, frames: u32) -> Result<(), ExecutionError> {
            let dir = Path::new(pattern)
                .parent()
                .ok_or_else(|| ExecutionError::IoError("frame pattern has no parent".into()))?;
            let frame = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([200, 40, 40])));
            for n in 1..=frames {
                frame
                    .save_with_format(dir.join(format!("frame_{:05}.png", n)), ImageFormat::Png)
                    .map_err(|e| ExecutionError::IoError(e.to_string()))?;
            }
            Ok(())
        }

        /// Decode `frame_00001.png`, `frame_00002.png`, ... until the first gap
        fn read_frames(pattern: &str) -> Result<Vec<EncodedFrame>, ExecutionError> {
            let dir = Path::new(pattern)
                .parent()
                .ok_or_else(|| ExecutionError::IoError("frame pattern has no parent".into()))?;
            let mut frames = Vec::new();
            for index in 1.. {
                let path = dir.join(format!("frame_{:05}.png", index));
                if !path.exists() {
                    break;
                }
                let image =
                    image::open(&path).map_err(|e| ExecutionError::IoError(e.to_string()))?;
                let max_alpha = image
                    .to_rgba8()
                    .pixels()
                    .map(|p| p[3])
                    .max()
                    .unwrap_or(0);
                frames.push(EncodedFrame {
                    index,
                    has_alpha: image.color().has_alpha(),
                    max_alpha,
                });
            }
            Ok(frames)
        }
    }

    #[async_trait]
    impl ProcessRunner for ScriptedProcessRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<ExecutionResult, ExecutionError> {
            self.calls.lock().unwrap().push(spec.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let last_arg = spec.args.last().cloned().unwrap_or_default();

            if spec.has_arg("-count_packets") {
                return match &self.probe {
                    ProbeScript::Frames(n) => Ok(Self::succeeded(format!("{}\n", n))),
                    ProbeScript::Output(raw) => Ok(Self::succeeded(raw.clone())),
                    ProbeScript::ExitCode(code) => Ok(Self::failed(*code, "mock probe failure")),
                    ProbeScript::SpawnError => {
                        Err(ExecutionError::SpawnFailed("mock ffprobe missing".into()))
                    }
                };
            }

            if spec.has_arg("-framerate") {
                return match &self.encode {
                    EncodeScript::Succeed => {
                        let pattern = spec.arg_after("-i").unwrap_or_default();
                        let frames = Self::read_frames(pattern)?;
                        std::fs::write(&last_arg, format!("frames={}\n", frames.len()))
                            .map_err(|e| ExecutionError::IoError(e.to_string()))?;
                        self.encoded.lock().unwrap().push((last_arg.clone(), frames));
                        Ok(Self::succeeded(""))
                    }
                    EncodeScript::ExitCode(code) => Ok(Self::failed(*code, "mock encode failure")),
                };
            }

            match &self.extract {
                ExtractScript::Frames(n) => {
                    Self::write_frames(&last_arg, *n)?;
                    Ok(Self::succeeded(""))
                }
                ExtractScript::ExitCode(code) => Ok(Self::failed(*code, "mock extract failure")),
            }
        }
    }
}
