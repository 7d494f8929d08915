// Pipeline constants (no magic values in stage code)
use std::time::Duration;

/// Longest video accepted, in frames
pub const DEFAULT_MAX_FRAMES: u32 = 250;

/// Frame rate of the encoded output
pub const DEFAULT_OUTPUT_FPS: u32 = 24;

/// Blocking workers shared by all jobs for per-frame transforms
pub const DEFAULT_TRANSFORM_WORKERS: usize = 2;

/// Deadline for a single ffprobe / ffmpeg invocation (10 minutes)
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// printf-style pattern ffmpeg reads and writes frames with
pub const FRAME_PATTERN: &str = "frame_%05d.png";

pub const FRAME_PREFIX: &str = "frame_";
pub const FRAME_EXTENSION: &str = "png";

/// Output codec settings: lossless VP9 keeping the alpha plane
pub const OUTPUT_CODEC: &str = "libvpx-vp9";
pub const OUTPUT_PIXEL_FORMAT: &str = "yuva420p";
