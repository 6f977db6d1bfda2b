//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] — Job submission, status, listing and cancellation
//! - [`metadata`] — Live metadata probes
//! - [`system`] — Health, events, OpenAPI, shutdown

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::JobId;

mod jobs;
mod metadata;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use jobs::*;
pub use metadata::*;
pub use system::*;

// ============================================================================
// Query/Request Types (shared across handlers)
// ============================================================================

/// Request body for POST /downloads/video
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitVideoRequest {
    /// Source URL of the video to download
    pub url: String,
    /// Destination directory for this job (defaults to the configured download_dir)
    #[schema(value_type = Option<String>)]
    pub output_dir: Option<PathBuf>,
}

/// Request body for POST /downloads/playlist
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitPlaylistRequest {
    /// Source URL of the playlist to download
    pub url: String,
    /// Cap on how many members to download (defaults to the configured value)
    pub max_videos: Option<usize>,
    /// Destination directory for this job (defaults to the configured download_dir)
    #[schema(value_type = Option<String>)]
    pub output_dir: Option<PathBuf>,
}

/// Response for job submissions - the ID of the queued job
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitResponse {
    /// ID of the newly queued job
    pub id: JobId,
}

/// Response for POST /jobs/:id/cancel
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CancelResponse {
    /// Whether the job was moved to cancelled
    pub cancelled: bool,
}

/// Query parameters for GET /jobs
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct ListJobsQuery {
    /// Maximum number of jobs to return (default: configured recent_jobs_limit)
    pub limit: Option<usize>,
}

/// Query parameters for the metadata probe endpoints
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct MetadataQuery {
    /// URL to probe
    pub url: String,
}
