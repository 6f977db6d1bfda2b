//! Job submission, status, listing and cancellation handlers.

use super::{CancelResponse, ListJobsQuery, SubmitPlaylistRequest, SubmitResponse, SubmitVideoRequest};
use crate::api::AppState;
use crate::error::{Error, JobError, Result};
use crate::types::{JobId, JobInfo};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

/// POST /downloads/video - Submit a single-video download job
#[utoipa::path(
    post,
    path = "/downloads/video",
    tag = "downloads",
    request_body = SubmitVideoRequest,
    responses(
        (status = 202, description = "Job queued", body = SubmitResponse),
        (status = 400, description = "URL could not be parsed or uses an unsupported scheme", body = crate::error::ApiError),
        (status = 503, description = "Shutdown in progress", body = crate::error::ApiError)
    )
)]
pub async fn submit_video(
    State(state): State<AppState>,
    Json(request): Json<SubmitVideoRequest>,
) -> Result<impl IntoResponse> {
    let id = state
        .downloader
        .download_video_to(&request.url, request.output_dir)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { id })))
}

/// POST /downloads/playlist - Submit a playlist download job
#[utoipa::path(
    post,
    path = "/downloads/playlist",
    tag = "downloads",
    request_body = SubmitPlaylistRequest,
    responses(
        (status = 202, description = "Job queued", body = SubmitResponse),
        (status = 400, description = "Invalid URL or zero member cap", body = crate::error::ApiError),
        (status = 503, description = "Shutdown in progress", body = crate::error::ApiError)
    )
)]
pub async fn submit_playlist(
    State(state): State<AppState>,
    Json(request): Json<SubmitPlaylistRequest>,
) -> Result<impl IntoResponse> {
    let id = state
        .downloader
        .download_playlist_to(&request.url, request.max_videos, request.output_dir)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { id })))
}

/// GET /jobs - List recent jobs
#[utoipa::path(
    get,
    path = "/jobs",
    tag = "jobs",
    params(
        ("limit" = Option<usize>, Query, description = "Maximum number of jobs to return")
    ),
    responses(
        (status = 200, description = "Recent jobs, newest first", body = Vec<JobInfo>),
        (status = 500, description = "Internal server error", body = crate::error::ApiError)
    )
)]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<Vec<JobInfo>>> {
    let jobs = state.downloader.list_recent_jobs(query.limit).await?;
    Ok(Json(jobs))
}

/// GET /jobs/:id - Get a single job
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job information", body = JobInfo),
        (status = 404, description = "Job not found", body = crate::error::ApiError)
    )
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobInfo>> {
    let info = state.downloader.job_status(&JobId::from(id)).await?;
    Ok(Json(info))
}

/// POST /jobs/:id/cancel - Cancel a pending or running job
#[utoipa::path(
    post,
    path = "/jobs/{id}/cancel",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job cancelled", body = CancelResponse),
        (status = 404, description = "Job not found", body = crate::error::ApiError),
        (status = 409, description = "Job already in a terminal state", body = crate::error::ApiError)
    )
)]
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>> {
    let id = JobId::from(id);

    if state.downloader.cancel(&id).await? {
        return Ok(Json(CancelResponse { cancelled: true }));
    }

    // Nothing was cancelled: either the job does not exist (404 from the
    // status lookup) or it already reached a terminal state (409).
    let info = state.downloader.job_status(&id).await?;
    Err(Error::Job(JobError::InvalidTransition {
        id,
        from: info.status.as_str().to_string(),
        to: "cancelled".to_string(),
    }))
}
