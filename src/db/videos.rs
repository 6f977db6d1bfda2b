//! Append-only video rows and lookups.

use crate::error::DatabaseError;
use crate::types::JobId;
use crate::{Error, Result};

use super::{Database, NewVideo, VideoRow};

const VIDEO_COLUMNS: &str = "id, title, description, duration_secs, file_path, source_url, \
                             job_id, playlist, pl_index, created_at";

impl Database {
    /// Insert a new video record
    pub async fn insert_video(&self, video: &NewVideo) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO videos (
                id, title, description, duration_secs, file_path,
                source_url, job_id, playlist, pl_index, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&video.id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(video.duration_secs)
        .bind(&video.file_path)
        .bind(&video.source_url)
        .bind(&video.job_id)
        .bind(&video.playlist)
        .bind(video.pl_index)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert video: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// List all videos recorded for a job, in insertion order
    pub async fn list_videos_by_job(&self, job_id: &JobId) -> Result<Vec<VideoRow>> {
        let rows = sqlx::query_as::<_, VideoRow>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE job_id = ? ORDER BY created_at ASC, rowid ASC"
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list videos by job: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// List all videos belonging to a playlist title, ordered by position
    pub async fn list_videos_by_playlist(&self, playlist: &str) -> Result<Vec<VideoRow>> {
        let rows = sqlx::query_as::<_, VideoRow>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE playlist = ? ORDER BY pl_index ASC"
        ))
        .bind(playlist)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list videos by playlist: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Find the most recently recorded video for a source URL
    pub async fn find_video_by_source_url(&self, url: &str) -> Result<Option<VideoRow>> {
        let row = sqlx::query_as::<_, VideoRow>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE source_url = ? \
             ORDER BY created_at DESC, rowid DESC LIMIT 1"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to find video by source url: {}",
                e
            )))
        })?;

        Ok(row)
    }
}
