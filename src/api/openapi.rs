//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the media-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-dl REST API
///
/// This struct is used to generate the OpenAPI 3.1 specification that describes
/// all available endpoints, request/response types, and API behavior.
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-dl REST API",
        version = "0.2.0",
        description = "OpenAPI 3.1 compliant REST API for submitting video and playlist download jobs, tracking their lifecycle, and probing source metadata",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:7788", description = "Local development server")
    ),
    paths(
        // Downloads
        crate::api::routes::submit_video,
        crate::api::routes::submit_playlist,

        // Jobs
        crate::api::routes::list_jobs,
        crate::api::routes::get_job,
        crate::api::routes::cancel_job,

        // Metadata
        crate::api::routes::video_metadata,
        crate::api::routes::playlist_metadata,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
        crate::api::routes::shutdown,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobId,
        crate::types::JobKind,
        crate::types::JobStatus,
        crate::types::Event,
        crate::types::JobInfo,
        crate::types::VideoInfo,
        crate::types::VideoMetadataReport,
        crate::types::PlaylistMetadataReport,
        crate::types::PlaylistItemInfo,

        // Config types from config.rs
        crate::config::Config,
        crate::config::DownloadConfig,
        crate::config::ToolConfig,
        crate::config::PersistenceConfig,
        crate::config::ApiConfig,

        // API request/response types from routes
        crate::api::routes::SubmitVideoRequest,
        crate::api::routes::SubmitPlaylistRequest,
        crate::api::routes::SubmitResponse,
        crate::api::routes::CancelResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "downloads", description = "Job submission - Queue video and playlist downloads"),
        (name = "jobs", description = "Job tracking - Query status, list recent jobs, cancel"),
        (name = "metadata", description = "Metadata probes - Live source metadata joined with local download state"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events, shutdown"),
    )
)]
pub struct ApiDoc;
