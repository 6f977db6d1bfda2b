//! Execution of video and playlist download tasks.
//!
//! Tasks run on the execution pool and drive jobs through the registry.
//! Transition rejections (a job cancelled under a running task) are logged
//! and swallowed: the registry's guards already recorded the authoritative
//! outcome, the task only has to stop.

use std::path::Path;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::db::NewVideo;
use crate::error::{Error, Result};
use crate::fetcher::VideoMetadata;
use crate::types::{Event, JobId};
use crate::utils::{predicted_file_path, truncate_description};

use super::MediaDownloader;

impl MediaDownloader {
    /// Run a single-video job to a terminal state
    pub(crate) async fn run_video_job(
        &self,
        id: &JobId,
        url: &str,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) {
        if let Err(e) = self.registry.start(id).await {
            // Cancelled (or otherwise moved) before the task claimed it
            tracing::debug!(job_id = %id, error = %e, "Job not started");
            return;
        }

        match self.execute_video(id, url, output_dir, cancel).await {
            Ok(()) => {
                if let Err(e) = self.registry.complete(id).await {
                    tracing::debug!(job_id = %id, error = %e, "Completion not recorded");
                }
            }
            Err(e) => {
                if let Err(db_err) = self.registry.fail(id, &e.to_string()).await {
                    tracing::debug!(job_id = %id, error = %db_err, "Failure not recorded");
                }
            }
        }
    }

    /// Run a playlist job to a terminal state
    pub(crate) async fn run_playlist_job(
        &self,
        id: &JobId,
        url: &str,
        output_dir: &Path,
        max_videos: usize,
        cancel: &CancellationToken,
    ) {
        if let Err(e) = self.registry.start(id).await {
            tracing::debug!(job_id = %id, error = %e, "Job not started");
            return;
        }

        match self
            .execute_playlist(id, url, output_dir, max_videos, cancel)
            .await
        {
            Ok(()) => {
                if let Err(e) = self.registry.complete(id).await {
                    tracing::debug!(job_id = %id, error = %e, "Completion not recorded");
                }
            }
            Err(e) => {
                if let Err(db_err) = self.registry.fail(id, &e.to_string()).await {
                    tracing::debug!(job_id = %id, error = %db_err, "Failure not recorded");
                }
            }
        }
    }

    async fn execute_video(
        &self,
        id: &JobId,
        url: &str,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        // Probe is best-effort: a video can often be fetched even when its
        // metadata cannot be dumped
        let metadata = match self.fetcher.probe(url).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(job_id = %id, url = %url, error = %e, "Metadata probe failed");
                VideoMetadata {
                    title: "unknown".to_string(),
                    ..VideoMetadata::default()
                }
            }
        };

        self.record_video(id, url, output_dir, &metadata, None, None)
            .await?;
        self.fetch_with_progress(id, url, output_dir, cancel).await
    }

    async fn execute_playlist(
        &self,
        id: &JobId,
        url: &str,
        output_dir: &Path,
        max_videos: usize,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let listing = self.fetcher.list_playlist(url, max_videos).await?;

        if listing.entries.is_empty() {
            return Err(Error::ExternalTool(format!(
                "playlist has no resolvable members: {url}"
            )));
        }

        let member_count = listing.entries.len();
        tracing::info!(
            job_id = %id,
            playlist = %listing.title,
            members = member_count,
            "Playlist resolved"
        );

        for (index, entry) in listing.entries.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(job_id = %id, processed = index, "Playlist job cancelled");
                return Err(Error::Other("cancelled".to_string()));
            }

            let position = (index + 1) as i64;

            let metadata = match self.fetcher.probe(&entry.url).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(
                        job_id = %id,
                        url = %entry.url,
                        error = %e,
                        "Member metadata probe failed"
                    );
                    VideoMetadata {
                        title: entry.title.clone().unwrap_or_else(|| "unknown".to_string()),
                        ..VideoMetadata::default()
                    }
                }
            };

            self.record_video(
                id,
                &entry.url,
                output_dir,
                &metadata,
                Some(listing.title.clone()),
                Some(position),
            )
            .await?;

            // A failed member is skipped, not fatal to the playlist job
            if let Err(e) = self.fetch_member(&entry.url, output_dir, cancel).await {
                if cancel.is_cancelled() {
                    return Err(Error::Other("cancelled".to_string()));
                }
                tracing::warn!(
                    job_id = %id,
                    url = %entry.url,
                    position,
                    error = %e,
                    "Playlist member fetch failed, skipping"
                );
            }

            let percent = ((index + 1) * 100 / member_count) as u8;
            if let Err(e) = self.registry.update_progress(id, percent).await {
                tracing::debug!(job_id = %id, error = %e, "Progress not recorded");
            }
        }

        Ok(())
    }

    /// Insert a video row and announce it
    async fn record_video(
        &self,
        job_id: &JobId,
        url: &str,
        output_dir: &Path,
        metadata: &VideoMetadata,
        playlist: Option<String>,
        position: Option<i64>,
    ) -> Result<()> {
        let path = predicted_file_path(output_dir, &metadata.title);
        let video = NewVideo {
            id: Uuid::new_v4().to_string(),
            title: metadata.title.clone(),
            description: truncate_description(&metadata.description),
            duration_secs: metadata.duration_secs,
            file_path: path.to_string_lossy().into_owned(),
            source_url: url.to_string(),
            job_id: job_id.clone(),
            playlist,
            pl_index: position,
        };
        self.db.insert_video(&video).await?;

        self.emit_event(Event::VideoRecorded {
            id: job_id.clone(),
            title: metadata.title.clone(),
            path,
        });
        Ok(())
    }

    /// Fetch a single video, forwarding parsed progress to the registry
    async fn fetch_with_progress(
        &self,
        id: &JobId,
        url: &str,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let registry = self.registry.clone();
        let progress_id = id.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(percent) = rx.recv().await {
                if let Err(e) = registry.update_progress(&progress_id, percent).await {
                    tracing::debug!(job_id = %progress_id, error = %e, "Progress not recorded");
                }
            }
        });

        let template = output_template(output_dir);
        let result = tokio::select! {
            result = self.fetcher.fetch(url, &template, tx) => result,
            () = cancel.cancelled() => Err(Error::Other("cancelled".to_string())),
        };

        // Sender side is gone either way; drain the forwarder before the
        // terminal transition so late progress cannot race completion
        let _ = forwarder.await;
        result
    }

    /// Fetch a playlist member without per-percent reporting
    ///
    /// Playlist jobs report coarse progress (members processed over member
    /// count), so the member's own progress stream is discarded.
    async fn fetch_member(
        &self,
        url: &str,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let (tx, _rx) = mpsc::unbounded_channel();
        let template = output_template(output_dir);
        tokio::select! {
            result = self.fetcher.fetch(url, &template, tx) => result,
            () = cancel.cancelled() => Err(Error::Other("cancelled".to_string())),
        }
    }
}

/// Output path template handed to the external tool
fn output_template(output_dir: &Path) -> String {
    output_dir
        .join("%(title)s.%(ext)s")
        .to_string_lossy()
        .into_owned()
}
