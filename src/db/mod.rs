//! Database layer for media-dl
//!
//! Handles SQLite persistence for jobs and recorded videos.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`jobs`] — Job rows: insert, conditional transitions, listing
//! - [`videos`] — Append-only video rows and lookups

use crate::types::{JobId, JobInfo, JobKind, JobStatus, PlaylistItemInfo, VideoInfo};
use chrono::{TimeZone, Utc};
use sqlx::{sqlite::SqlitePool, FromRow};
use std::path::PathBuf;

mod jobs;
mod migrations;
mod videos;

/// New job to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Unique job identifier (UUID v4, generated by the caller)
    pub id: JobId,
    /// Kind of job (video or playlist)
    pub kind: JobKind,
    /// Source URL
    pub url: String,
}

/// Job record from database
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    /// Unique job identifier
    pub id: JobId,
    /// Kind code ("video" or "playlist")
    pub kind: String,
    /// Source URL
    pub url: String,
    /// Status code ("pending", "running", "completed", "failed", "cancelled")
    pub status: String,
    /// Progress percentage (0-100)
    pub progress: i64,
    /// Error message if the job failed
    pub error_message: Option<String>,
    /// Unix timestamp when the job was created
    pub created_at: i64,
    /// Unix timestamp when the job reached a terminal state
    pub completed_at: Option<i64>,
}

impl JobRow {
    /// Decoded status of this row
    pub fn job_status(&self) -> JobStatus {
        JobStatus::from_str(&self.status)
    }
}

impl From<JobRow> for JobInfo {
    fn from(row: JobRow) -> Self {
        let status = row.job_status();
        JobInfo {
            id: row.id,
            kind: JobKind::from_str(&row.kind),
            url: row.url,
            status,
            progress: row.progress.clamp(0, 100) as u8,
            error_message: row.error_message,
            created_at: Utc
                .timestamp_opt(row.created_at, 0)
                .single()
                .unwrap_or_else(Utc::now),
            completed_at: row
                .completed_at
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
        }
    }
}

/// New video to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewVideo {
    /// Unique video identifier (UUID v4, generated by the caller)
    pub id: String,
    /// Video title
    pub title: String,
    /// Description (the caller truncates before inserting)
    pub description: String,
    /// Duration in seconds, when known
    pub duration_secs: Option<i64>,
    /// Expected path of the downloaded file
    pub file_path: String,
    /// Source URL of the individual video
    pub source_url: String,
    /// The job this row belongs to
    pub job_id: JobId,
    /// Playlist title (None for single-video jobs)
    pub playlist: Option<String>,
    /// 1-based position within the playlist (None for single-video jobs)
    pub pl_index: Option<i64>,
}

/// Video record from database
#[derive(Debug, Clone, FromRow)]
pub struct VideoRow {
    /// Unique video identifier
    pub id: String,
    /// Video title
    pub title: String,
    /// Description
    pub description: String,
    /// Duration in seconds, when known
    pub duration_secs: Option<i64>,
    /// Expected path of the downloaded file
    pub file_path: String,
    /// Source URL of the individual video
    pub source_url: String,
    /// The job this row belongs to
    pub job_id: JobId,
    /// Playlist title (None for single-video jobs)
    pub playlist: Option<String>,
    /// 1-based position within the playlist (None for single-video jobs)
    pub pl_index: Option<i64>,
    /// Unix timestamp when the row was recorded
    pub created_at: i64,
}

impl From<VideoRow> for VideoInfo {
    fn from(row: VideoRow) -> Self {
        VideoInfo {
            id: row.id,
            title: row.title,
            description: row.description,
            duration_secs: row.duration_secs,
            file_path: PathBuf::from(row.file_path),
            source_url: row.source_url,
            job_id: row.job_id,
            playlist: row.playlist,
            position: row.pl_index,
            created_at: Utc
                .timestamp_opt(row.created_at, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }
}

impl From<VideoRow> for PlaylistItemInfo {
    fn from(row: VideoRow) -> Self {
        PlaylistItemInfo {
            position: row.pl_index.unwrap_or(0),
            title: row.title,
            file_path: PathBuf::from(row.file_path),
            created_at: Utc
                .timestamp_opt(row.created_at, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }
}

/// Database handle for media-dl
pub struct Database {
    pool: SqlitePool,
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
