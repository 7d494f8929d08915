//! HTTP Handlers
//!
//! Thin adapters from axum extractors to the core use cases.

use crate::error::{ApiError, ApiResult};
use crate::rate_limiter::RateLimiter;
use crate::types::{HealthResponse, SubmitResponse, FIELD_FILE, FIELD_METHOD};
use axum::body::Body;
use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::Json;
use backdrop_core::application::{
    query_status, AdmissionService, StagedUpload, StatusView, StillImageService,
};
use backdrop_core::domain::{JobStatus, MethodName};
use backdrop_core::port::JobRegistry;
use backdrop_core::AppError;
use futures::TryStreamExt;
use std::io;
use std::sync::Arc;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::{debug, warn};

/// Process-wide services shared by every request
#[derive(Clone)]
pub struct AppServices {
    pub admission: Arc<AdmissionService>,
    pub registry: Arc<dyn JobRegistry>,
    pub still_images: Arc<StillImageService>,
    pub admission_limiter: Arc<RateLimiter>,
}

fn malformed(err: MultipartError) -> ApiError {
    ApiError::bad_request(format!("Malformed multipart body: {}", err))
}

fn missing(field: &str) -> ApiError {
    ApiError::bad_request(format!("Missing form field: {}", field))
}

/// POST /remove_background_video/
///
/// Responds as soon as the job is registered; the pipeline keeps running.
pub async fn submit_video(
    State(services): State<AppServices>,
    mut multipart: Multipart,
) -> ApiResult<Json<SubmitResponse>> {
    if !services.admission_limiter.try_acquire() {
        return Err(ApiError::RateLimited);
    }

    let mut staged: Option<StagedUpload> = None;
    let mut method: Option<String> = None;

    let read = read_video_form(&services.admission, &mut multipart, &mut staged, &mut method).await;
    if let Err(e) = read {
        if let Some(upload) = staged {
            services.admission.discard(upload).await;
        }
        return Err(e);
    }

    let (staged, method) = match (staged, method) {
        (Some(staged), Some(method)) => (staged, method),
        (Some(staged), None) => {
            services.admission.discard(staged).await;
            return Err(missing(FIELD_METHOD));
        }
        (None, _) => return Err(missing(FIELD_FILE)),
    };

    let admitted = services
        .admission
        .admit(staged, MethodName::new(method))
        .await?;

    Ok(Json(SubmitResponse {
        job_id: admitted.job_id,
    }))
}

/// Walk the form, streaming `file` straight to working storage
async fn read_video_form(
    admission: &AdmissionService,
    multipart: &mut Multipart,
    staged: &mut Option<StagedUpload>,
    method: &mut Option<String>,
) -> ApiResult<()> {
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FIELD_FILE => {
                let upload = stage_field(admission, field).await?;
                if let Some(previous) = staged.replace(upload) {
                    admission.discard(previous).await;
                }
            }
            FIELD_METHOD => *method = Some(field.text().await.map_err(malformed)?),
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }
    Ok(())
}

async fn stage_field(admission: &AdmissionService, field: Field<'_>) -> ApiResult<StagedUpload> {
    let stream = field.map_err(io::Error::other);
    let reader = StreamReader::new(stream);
    tokio::pin!(reader);
    admission
        .stage_upload(&mut reader)
        .await
        .map_err(|e| match e {
            AppError::Io(err) if is_body_error(&err) => {
                ApiError::bad_request(format!("Malformed multipart body: {}", err))
            }
            other => other.into(),
        })
}

/// The upload broke on the client side, not on our disk
fn is_body_error(err: &io::Error) -> bool {
    err.get_ref()
        .is_some_and(|inner| inner.is::<MultipartError>())
}

/// GET /status/:job_id
///
/// JSON snapshot until the job completes, then the encoded video itself.
pub async fn job_status(
    State(services): State<AppServices>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    match query_status(services.registry.as_ref(), &job_id).await? {
        StatusView::Pending(snapshot) => Ok(Json(snapshot).into_response()),
        StatusView::Ready {
            output_path,
            size_bytes,
        } => {
            let file = match tokio::fs::File::open(&output_path).await {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(ApiError::not_found("Processed video file not found"));
                }
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "Failed to open artifact");
                    return Err(ApiError::internal(e.to_string()));
                }
            };

            let headers = [
                (CONTENT_TYPE, "video/webm".to_string()),
                (CONTENT_LENGTH, size_bytes.to_string()),
                (
                    CONTENT_DISPOSITION,
                    format!("attachment; filename=\"processed_video_{}.webm\"", job_id),
                ),
            ];
            let body = Body::from_stream(ReaderStream::new(file));
            Ok((headers, body).into_response())
        }
    }
}

/// POST /remove_background/
pub async fn remove_background_image(
    State(services): State<AppServices>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let mut image: Option<Vec<u8>> = None;
    let mut method: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FIELD_FILE => image = Some(field.bytes().await.map_err(malformed)?.to_vec()),
            FIELD_METHOD => method = Some(field.text().await.map_err(malformed)?),
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    let image = image.ok_or_else(|| missing(FIELD_FILE))?;
    let method = method.ok_or_else(|| missing(FIELD_METHOD))?;

    let png = services
        .still_images
        .remove_background(image, &method)
        .await?;

    Ok(([(CONTENT_TYPE, "image/png")], png).into_response())
}

/// GET /health
pub async fn health(State(services): State<AppServices>) -> ApiResult<Json<HealthResponse>> {
    let processing_jobs = services
        .registry
        .count_by_status(JobStatus::Processing)
        .await?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: backdrop_core::VERSION.to_string(),
        processing_jobs,
    }))
}
