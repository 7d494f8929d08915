//! Backdrop Client Implementation

use crate::error::{Result, SdkError};
use crate::types::{HealthResponse, JobSnapshot, JobState, JobStatus, SubmitResponse};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Backdrop service client
///
/// # Example
///
/// ```no_run
/// use backdrop_sdk::BackdropClient;
/// use std::path::Path;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = BackdropClient::connect("http://127.0.0.1:9876")?;
/// let job_id = client.submit_video(Path::new("clip.mp4"), "u2net").await?;
/// client
///     .wait_for_output(&job_id, Path::new("clip.webm"), Duration::from_secs(1), None)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct BackdropClient {
    http: Client,
    base_url: String,
}

/// Body of a status poll, before interpretation
enum Fetched {
    Snapshot(JobSnapshot),
    Artifact(Response),
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

impl BackdropClient {
    /// Create a client for the daemon at `url` (e.g. `http://127.0.0.1:9876`)
    pub fn connect(url: impl AsRef<str>) -> Result<Self> {
        let base_url = normalize_base_url(url.as_ref())?;
        let http = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Upload a video and start a background-removal job; returns the job id
    pub async fn submit_video(&self, path: &Path, method: &str) -> Result<String> {
        let form = Form::new()
            .part("file", file_part(path).await?)
            .text("method", method.to_string());

        let response = self
            .http
            .post(self.url("/remove_background_video/"))
            .multipart(form)
            .send()
            .await?;
        let submitted: SubmitResponse = check(response).await?.json().await?;
        Ok(submitted.job_id)
    }

    /// Poll a job once
    pub async fn status(&self, job_id: &str) -> Result<JobState> {
        Ok(match self.fetch(job_id).await? {
            Fetched::Artifact(_) => JobState::Completed,
            Fetched::Snapshot(s) if s.status == JobStatus::Error => JobState::Failed(s),
            Fetched::Snapshot(s) => JobState::Processing(s),
        })
    }

    /// Poll until the job finishes, then stream its video into `dest`
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    /// - SdkError::JobFailed if the job ends in error
    /// - SdkError::Timeout if `timeout` elapses first
    pub async fn wait_for_output(
        &self,
        job_id: &str,
        dest: &Path,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> Result<u64> {
        let started = Instant::now();

        loop {
            match self.fetch(job_id).await? {
                Fetched::Artifact(response) => return save(response, dest).await,
                Fetched::Snapshot(snapshot) if snapshot.status == JobStatus::Error => {
                    return Err(SdkError::JobFailed {
                        job_id: job_id.to_string(),
                        message: snapshot.message.unwrap_or_default(),
                    });
                }
                Fetched::Snapshot(_) => {}
            }

            if let Some(limit) = timeout {
                if started.elapsed() >= limit {
                    return Err(SdkError::Timeout {
                        job_id: job_id.to_string(),
                        waited: started.elapsed(),
                    });
                }
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Remove the background of a single image; returns PNG bytes
    pub async fn remove_background_image(&self, path: &Path, method: &str) -> Result<Vec<u8>> {
        let form = Form::new()
            .part("file", file_part(path).await?)
            .text("method", method.to_string());

        let response = self
            .http
            .post(self.url("/remove_background/"))
            .multipart(form)
            .send()
            .await?;
        Ok(check(response).await?.bytes().await?.to_vec())
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self.http.get(self.url("/health")).send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn fetch(&self, job_id: &str) -> Result<Fetched> {
        let response = self
            .http
            .get(self.url(&format!("/status/{}", job_id)))
            .send()
            .await?;
        let response = check(response).await?;

        let is_video = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("video/"));

        if is_video {
            Ok(Fetched::Artifact(response))
        } else {
            Ok(Fetched::Snapshot(response.json().await?))
        }
    }
}

fn normalize_base_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(SdkError::InvalidUrl(url.to_string()));
    }
    Ok(trimmed.to_string())
}

async fn file_part(path: &Path) -> Result<Part> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(Part::bytes(bytes).file_name(file_name))
}

/// Turn a non-2xx response into `SdkError::Api`
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SdkError::Api {
        status: status.as_u16(),
        detail: error_detail(&body),
    })
}

fn error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.detail)
        .unwrap_or_else(|_| body.trim().to_string())
}

async fn save(mut response: Response, dest: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::create(dest).await?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}
