//! Daemon configuration from `BACKDROP_*` environment variables

use anyhow::{Context, Result};
use backdrop_api_http::HttpServerConfig;
use backdrop_core::application::{PipelineConfig, ToolPaths};
use backdrop_core::port::MaintenanceConfig;
use backdrop_infra_system::DEFAULT_ENV_ALLOWLIST;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_STORAGE_DIR: &str = "temp_videos";
const DEFAULT_ACCELERATOR: &str = "cuda:0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub http: HttpServerConfig,
    pub storage_dir: PathBuf,
    pub pipeline: PipelineConfig,
    pub maintenance: MaintenanceConfig,
    pub rembg_program: String,
    pub inspyrenet_program: String,
    /// Variables external tools inherit: the defaults plus `BACKDROP_TOOL_ENV`
    pub tool_env: Vec<String>,
    /// None disables the accelerator lease (`BACKDROP_ACCELERATOR=none`)
    pub accelerator: Option<String>,
    pub log_format: LogFormat,
    pub log_dir: Option<PathBuf>,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let http_defaults = HttpServerConfig::default();
        let pipeline_defaults = PipelineConfig::default();
        let maintenance_defaults = MaintenanceConfig::default();

        let http = HttpServerConfig {
            host: env.string("BACKDROP_HOST", &http_defaults.host),
            port: env.parse("BACKDROP_PORT", http_defaults.port)?,
            max_upload_bytes: env
                .parse("BACKDROP_MAX_UPLOAD_MB", http_defaults.max_upload_bytes / (1024 * 1024))?
                * 1024
                * 1024,
            rate_limit_burst: env.parse("BACKDROP_RATE_LIMIT_BURST", http_defaults.rate_limit_burst)?,
            rate_limit_rate: env.parse("BACKDROP_RATE_LIMIT_RATE", http_defaults.rate_limit_rate)?,
        };

        let tool_timeout_secs = env.parse(
            "BACKDROP_TOOL_TIMEOUT_SECS",
            pipeline_defaults
                .tool_timeout
                .map(|t| t.as_secs())
                .unwrap_or(0),
        )?;
        let pipeline = PipelineConfig {
            max_frames: env.parse("BACKDROP_MAX_FRAMES", pipeline_defaults.max_frames)?,
            output_fps: env.parse("BACKDROP_OUTPUT_FPS", pipeline_defaults.output_fps)?,
            tools: ToolPaths {
                ffmpeg: env.string("BACKDROP_FFMPEG", &pipeline_defaults.tools.ffmpeg),
                ffprobe: env.string("BACKDROP_FFPROBE", &pipeline_defaults.tools.ffprobe),
            },
            // 0 means no deadline
            tool_timeout: (tool_timeout_secs > 0).then(|| Duration::from_secs(tool_timeout_secs)),
            transform_workers: env
                .parse("BACKDROP_TRANSFORM_WORKERS", pipeline_defaults.transform_workers)?,
        };

        let maintenance = MaintenanceConfig {
            retention: Duration::from_secs(
                env.parse("BACKDROP_RETENTION_SECS", maintenance_defaults.retention.as_secs())?,
            ),
            sweep_interval: Duration::from_secs(env.parse(
                "BACKDROP_SWEEP_INTERVAL_SECS",
                maintenance_defaults.sweep_interval.as_secs(),
            )?),
        };
        if maintenance.sweep_interval.is_zero() {
            anyhow::bail!("BACKDROP_SWEEP_INTERVAL_SECS must be greater than 0");
        }

        let accelerator = match env.string("BACKDROP_ACCELERATOR", DEFAULT_ACCELERATOR) {
            name if name.is_empty() || name.eq_ignore_ascii_case("none") => None,
            name => Some(name),
        };

        let mut tool_env: Vec<String> =
            DEFAULT_ENV_ALLOWLIST.iter().map(|s| s.to_string()).collect();
        for name in env.string("BACKDROP_TOOL_ENV", "").split(',') {
            let name = name.trim();
            if !name.is_empty() && !tool_env.iter().any(|known| known == name) {
                tool_env.push(name.to_string());
            }
        }

        let log_format = match env.string("BACKDROP_LOG_FORMAT", "pretty").as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            http,
            storage_dir: expand(&env.string("BACKDROP_STORAGE_DIR", DEFAULT_STORAGE_DIR)),
            pipeline,
            maintenance,
            rembg_program: env.string("BACKDROP_REMBG", "rembg"),
            inspyrenet_program: env.string("BACKDROP_INSPYRENET", "transparent-background"),
            tool_env,
            accelerator,
            log_format,
            log_dir: env.get("BACKDROP_LOG_DIR").map(|dir| expand(&dir)),
        })
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(key) {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
            None => Ok(default),
        }
    }
}
