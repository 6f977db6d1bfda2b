//! Live metadata probe handlers.

use super::MetadataQuery;
use crate::api::AppState;
use crate::error::Result;
use crate::types::{PlaylistMetadataReport, VideoMetadataReport};
use axum::{
    extract::{Query, State},
    Json,
};

/// GET /metadata/video - Probe live video metadata
///
/// Runs a metadata probe against the source without queueing a download, and
/// joins the result with local state: whether a completed job has already
/// recorded this URL, and where the file landed if so.
#[utoipa::path(
    get,
    path = "/metadata/video",
    tag = "metadata",
    params(
        ("url" = String, Query, description = "Video URL to probe")
    ),
    responses(
        (status = 200, description = "Video metadata", body = VideoMetadataReport),
        (status = 502, description = "The external tool failed to probe the URL", body = crate::error::ApiError),
        (status = 504, description = "The probe exceeded its time bound", body = crate::error::ApiError)
    )
)]
pub async fn video_metadata(
    State(state): State<AppState>,
    Query(query): Query<MetadataQuery>,
) -> Result<Json<VideoMetadataReport>> {
    let report = state.downloader.video_metadata(&query.url).await?;
    Ok(Json(report))
}

/// GET /metadata/playlist - Probe live playlist metadata
#[utoipa::path(
    get,
    path = "/metadata/playlist",
    tag = "metadata",
    params(
        ("url" = String, Query, description = "Playlist URL to probe")
    ),
    responses(
        (status = 200, description = "Playlist metadata with locally recorded members", body = PlaylistMetadataReport),
        (status = 502, description = "The external tool failed to list the playlist", body = crate::error::ApiError),
        (status = 504, description = "The listing exceeded its time bound", body = crate::error::ApiError)
    )
)]
pub async fn playlist_metadata(
    State(state): State<AppState>,
    Query(query): Query<MetadataQuery>,
) -> Result<Json<PlaylistMetadataReport>> {
    let report = state.downloader.playlist_metadata(&query.url).await?;
    Ok(Json(report))
}
