//! Status, listing and metadata queries.

use std::path::PathBuf;

use crate::error::Result;
use crate::types::{
    JobId, JobInfo, JobStatus, PlaylistMetadataReport, VideoMetadataReport,
};
use crate::utils::{truncate_chars, MAX_REPORT_DESCRIPTION_LEN};

use super::MediaDownloader;

impl MediaDownloader {
    /// Get the current state of a job
    pub async fn job_status(&self, id: &JobId) -> Result<JobInfo> {
        self.registry.require(id).await
    }

    /// List the most recently submitted jobs, newest first
    ///
    /// The configured default limit applies when `None` is passed.
    pub async fn list_recent_jobs(&self, limit: Option<usize>) -> Result<Vec<JobInfo>> {
        let limit = limit.unwrap_or(self.config.persistence.recent_jobs_limit);
        self.registry.list_recent(limit).await
    }

    /// Probe live metadata for a video URL and join it with local state
    ///
    /// The report carries what the source says about the video right now,
    /// plus whether a completed job has already recorded this URL and where
    /// the file is expected to be.
    pub async fn video_metadata(&self, url: &str) -> Result<VideoMetadataReport> {
        let metadata = self.fetcher.probe(url).await?;

        let mut downloaded = false;
        let mut file_path: Option<PathBuf> = None;
        if let Some(video) = self.db.find_video_by_source_url(url).await? {
            let job = self.db.get_job(&video.job_id).await?;
            if job.map(|j| j.job_status() == JobStatus::Completed) == Some(true) {
                downloaded = true;
                file_path = Some(PathBuf::from(video.file_path));
            }
        }

        Ok(VideoMetadataReport {
            url: url.to_string(),
            title: metadata.title,
            description: truncate_chars(&metadata.description, MAX_REPORT_DESCRIPTION_LEN),
            duration_secs: metadata.duration_secs,
            uploader: metadata.uploader,
            upload_date: metadata.upload_date,
            view_count: metadata.view_count,
            like_count: metadata.like_count,
            format_count: metadata.format_count,
            downloaded,
            file_path,
        })
    }

    /// Probe live metadata for a playlist URL and join it with recorded members
    ///
    /// `member_count` is what the source reports for the whole playlist, while
    /// `downloaded_items` lists only the members recorded locally, in playlist
    /// order.
    pub async fn playlist_metadata(&self, url: &str) -> Result<PlaylistMetadataReport> {
        let listing = self
            .fetcher
            .list_playlist(url, self.config.download.default_max_playlist_videos)
            .await?;

        let downloaded_items = self
            .db
            .list_videos_by_playlist(&listing.title)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(PlaylistMetadataReport {
            url: url.to_string(),
            title: listing.title,
            description: listing.description,
            uploader: listing.uploader,
            member_count: listing.total_count,
            downloaded_items,
        })
    }
}
