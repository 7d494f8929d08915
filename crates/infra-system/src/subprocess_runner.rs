// Subprocess runner implementation
// Spawns isolated child processes with an environment allowlist and optional deadline
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use backdrop_core::port::{
    CommandSpec, ExecutionError, ExecutionResult, ExecutionStatus, ProcessRunner, TimeProvider,
};

/// Variables passed through to media and model tools by default
pub const DEFAULT_ENV_ALLOWLIST: &[&str] = &[
    "PATH",
    "HOME",
    "USER",
    "LANG",
    "LC_ALL",
    "TMPDIR",
    "LD_LIBRARY_PATH",
    "CUDA_VISIBLE_DEVICES",
    "U2NET_HOME",
    "XDG_CACHE_HOME",
    // Python model tools: interpreter location and model caches
    "VIRTUAL_ENV",
    "PYTHONPATH",
    "HF_HOME",
    "TORCH_HOME",
];

/// Subprocess runner
///
/// Children start with a cleared environment plus the allowlisted variables of
/// this process, and are killed if their future is dropped (e.g. on timeout).
pub struct SubprocessRunner {
    time_provider: Arc<dyn TimeProvider>,
    env_allowlist: Vec<String>,
}

impl SubprocessRunner {
    /// # Arguments
    /// * `time_provider` - Time provider for duration tracking
    /// * `env_allowlist` - Environment variables children may see
    pub fn new(time_provider: Arc<dyn TimeProvider>, env_allowlist: Vec<String>) -> Self {
        Self {
            time_provider,
            env_allowlist,
        }
    }

    /// Runner with [`DEFAULT_ENV_ALLOWLIST`]
    pub fn with_default_env(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self::new(
            time_provider,
            DEFAULT_ENV_ALLOWLIST.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Keep only allowlisted variables
    fn filter_env<I>(&self, env: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        env.into_iter()
            .filter(|(k, _)| self.env_allowlist.contains(k))
            .collect()
    }

    async fn spawn_and_wait(
        &self,
        spec: &CommandSpec,
    ) -> Result<std::process::Output, ExecutionError> {
        let child = Command::new(&spec.program)
            .args(&spec.args)
            .env_clear()
            .envs(self.filter_env(std::env::vars()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecutionError::SpawnFailed(format!("{}: {}", spec.program, e)))?;

        match spec.timeout {
            Some(limit) => match timeout(limit, child.wait_with_output()).await {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(e)) => Err(ExecutionError::IoError(e.to_string())),
                Err(_) => {
                    warn!(command = %spec.program, timeout_ms = limit.as_millis() as u64, "Process timed out, killed");
                    Err(ExecutionError::Timeout(limit.as_millis() as u64))
                }
            },
            None => child
                .wait_with_output()
                .await
                .map_err(|e| ExecutionError::IoError(e.to_string())),
        }
    }

    fn build_result(output: std::process::Output, duration_ms: i64) -> ExecutionResult {
        let status = if output.status.success() {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failed
        };

        ExecutionResult {
            status,
            exit_code: output.status.code(),
            duration_ms,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

#[async_trait]
impl ProcessRunner for SubprocessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<ExecutionResult, ExecutionError> {
        let start_time = self.time_provider.now_millis();
        debug!(command = %spec, timeout = ?spec.timeout, "Starting subprocess");

        let output = self.spawn_and_wait(spec).await?;
        let duration_ms = self.time_provider.now_millis() - start_time;
        let result = Self::build_result(output, duration_ms);

        debug!(
            command = %spec.program,
            duration_ms,
            exit_code = ?result.exit_code,
            status = ?result.status,
            "Subprocess finished"
        );

        Ok(result)
    }
}
