//! Media fetching seam over the external download tool.
//!
//! [`MediaFetcher`] abstracts the three tool invocations a download task
//! needs (metadata probe, flat playlist listing, content fetch), enabling
//! testability. The production implementation is [`YtDlpFetcher`].

pub mod progress;
mod ytdlp;

pub use ytdlp::YtDlpFetcher;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;

/// Metadata for a single video, as reported by the source
#[derive(Debug, Clone, Default)]
pub struct VideoMetadata {
    /// Video title
    pub title: String,
    /// Full description (callers truncate before storing)
    pub description: String,
    /// Duration in seconds (None when the source does not report one)
    pub duration_secs: Option<i64>,
    /// Uploader / channel name
    pub uploader: Option<String>,
    /// Upload date as reported by the source (YYYYMMDD)
    pub upload_date: Option<String>,
    /// View count
    pub view_count: Option<i64>,
    /// Like count
    pub like_count: Option<i64>,
    /// Number of formats the source offers
    pub format_count: usize,
}

/// One member of a flat playlist listing
#[derive(Debug, Clone)]
pub struct PlaylistEntry {
    /// Resolved URL of the member video
    pub url: String,
    /// Member title, when the flat listing carries one
    pub title: Option<String>,
}

/// Result of a flat playlist listing
#[derive(Debug, Clone)]
pub struct PlaylistListing {
    /// Playlist title
    pub title: String,
    /// Playlist description
    pub description: Option<String>,
    /// Uploader / channel name
    pub uploader: Option<String>,
    /// Total member count the source reports (may exceed the listed entries)
    pub total_count: usize,
    /// The listed members, in source order, capped at the requested maximum
    pub entries: Vec<PlaylistEntry>,
}

/// Channel used to stream progress percentages out of a running fetch
pub type ProgressSender = mpsc::UnboundedSender<u8>;

/// Abstraction over the external download tool, enabling testability.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Probe metadata for a single video without fetching content
    async fn probe(&self, url: &str) -> Result<VideoMetadata>;

    /// Resolve the first `max_entries` members of a playlist without
    /// fetching content
    async fn list_playlist(&self, url: &str, max_entries: usize) -> Result<PlaylistListing>;

    /// Fetch one video, streaming progress percentages as they are parsed
    ///
    /// `output_template` is the tool's output path template (for example
    /// `downloads/%(title)s.%(ext)s`). A non-zero exit or an exceeded time
    /// bound is an error carrying the tool's diagnostic text.
    async fn fetch(&self, url: &str, output_template: &str, progress: ProgressSender)
        -> Result<()>;
}
