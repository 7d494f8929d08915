// Media tool command builders
// One function per stage; keeps argument lists out of the orchestrator

use super::config::PipelineConfig;
use super::constants::{FRAME_PATTERN, OUTPUT_CODEC, OUTPUT_PIXEL_FORMAT};
use crate::port::CommandSpec;
use std::path::Path;

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Count video packets of the first video stream; prints a single integer
pub fn probe_frames(config: &PipelineConfig, input: &Path) -> CommandSpec {
    CommandSpec::new(&config.tools.ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_packets",
            "-show_entries",
            "stream=nb_read_packets",
            "-of",
            "csv=p=0",
        ])
        .arg(path_arg(input))
        .timeout(config.tool_timeout)
}

/// Decode every frame of `input` into numbered PNG files inside `frame_dir`
pub fn extract_frames(config: &PipelineConfig, input: &Path, frame_dir: &Path) -> CommandSpec {
    CommandSpec::new(&config.tools.ffmpeg)
        .args(["-y", "-v", "error", "-i"])
        .arg(path_arg(input))
        .arg(path_arg(&frame_dir.join(FRAME_PATTERN)))
        .timeout(config.tool_timeout)
}

/// Encode the numbered frames in `frame_dir` into a lossless VP9 WebM with alpha
pub fn encode_video(config: &PipelineConfig, frame_dir: &Path, output: &Path) -> CommandSpec {
    CommandSpec::new(&config.tools.ffmpeg)
        .args(["-y", "-v", "error", "-framerate"])
        .arg(config.output_fps.to_string())
        .arg("-i")
        .arg(path_arg(&frame_dir.join(FRAME_PATTERN)))
        .args([
            "-c:v",
            OUTPUT_CODEC,
            "-pix_fmt",
            OUTPUT_PIXEL_FORMAT,
            "-lossless",
            "1",
        ])
        .arg(path_arg(output))
        .timeout(config.tool_timeout)
}

/// Parse the probe's stdout into a frame count
///
/// ffprobe prints e.g. `"120\n"`; some builds append a trailing comma.
pub fn parse_frame_count(stdout: &str) -> Option<u32> {
    let trimmed = stdout.trim().trim_end_matches(',').trim();
    trimmed.parse().ok()
}
