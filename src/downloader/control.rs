//! Job submission, cancellation and shutdown.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{Error, Result};
use crate::types::{JobId, JobKind};

use super::MediaDownloader;

impl MediaDownloader {
    /// Submit a single-video download job into the configured directory
    ///
    /// The job is persisted as pending and a task is spawned onto the
    /// execution pool. This method returns as soon as the row exists; it
    /// never waits for a pool slot, so callers can oversubscribe the pool
    /// freely and excess jobs simply stay pending until a slot frees up.
    pub async fn download_video(&self, url: &str) -> Result<JobId> {
        self.download_video_to(url, None).await
    }

    /// Submit a single-video download job with an explicit destination
    ///
    /// The destination directory overrides the configured `download_dir` for
    /// this job only. It is created here, so an unusable destination fails
    /// the submission instead of the job.
    pub async fn download_video_to(
        &self,
        url: &str,
        output_dir: Option<PathBuf>,
    ) -> Result<JobId> {
        self.ensure_accepting()?;
        validate_url(url)?;
        let dir = self.resolve_output_dir(output_dir).await?;

        let id = self.registry.create(JobKind::Video, url).await?;
        self.spawn_job(id.clone(), url.to_string(), dir, None).await;
        Ok(id)
    }

    /// Submit a playlist download job into the configured directory
    ///
    /// Up to `max_videos` members are downloaded (the configured default
    /// applies when `None`). Individual member failures do not fail the job.
    pub async fn download_playlist(&self, url: &str, max_videos: Option<usize>) -> Result<JobId> {
        self.download_playlist_to(url, max_videos, None).await
    }

    /// Submit a playlist download job with an explicit destination
    pub async fn download_playlist_to(
        &self,
        url: &str,
        max_videos: Option<usize>,
        output_dir: Option<PathBuf>,
    ) -> Result<JobId> {
        self.ensure_accepting()?;
        validate_url(url)?;

        if max_videos == Some(0) {
            return Err(Error::Config {
                message: "max_videos must be at least 1".into(),
                key: None,
            });
        }
        let cap = max_videos.unwrap_or(self.config.download.default_max_playlist_videos);
        let dir = self.resolve_output_dir(output_dir).await?;

        let id = self.registry.create(JobKind::Playlist, url).await?;
        self.spawn_job(id.clone(), url.to_string(), dir, Some(cap))
            .await;
        Ok(id)
    }

    /// Cancel a job
    ///
    /// Pending jobs never start; running jobs are signalled through their
    /// cancellation token and stop at the next checkpoint. Returns `true`
    /// when this call cancelled the job, `false` when the job is unknown or
    /// already terminal.
    pub async fn cancel(&self, id: &JobId) -> Result<bool> {
        let cancelled = self.registry.cancel(id).await?;
        if cancelled {
            if let Some(token) = self.pool.active_jobs.lock().await.get(id) {
                token.cancel();
            }
        }
        Ok(cancelled)
    }

    /// Gracefully shut down the downloader
    ///
    /// Stops accepting new jobs, prevents queued tasks from starting, and
    /// waits for in-flight tasks to finish. Jobs that never started remain
    /// pending in the store.
    pub async fn shutdown(&self) {
        self.pool.accepting_new.store(false, Ordering::SeqCst);
        // Queued tasks waiting on a pool slot get an acquire error and exit
        self.pool.concurrent_limit.close();
        self.emit_event(crate::types::Event::Shutdown);

        loop {
            if self.pool.active_jobs.lock().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        tracing::info!("Downloader shut down");
    }

    fn ensure_accepting(&self) -> Result<()> {
        if self.pool.accepting_new.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::ShuttingDown)
        }
    }

    /// Resolve the effective destination directory and make sure it exists
    async fn resolve_output_dir(&self, output_dir: Option<PathBuf>) -> Result<PathBuf> {
        let dir = output_dir.unwrap_or_else(|| self.config.download_dir().clone());
        tokio::fs::create_dir_all(&dir).await.map_err(|e| Error::Config {
            message: format!("cannot create output directory {}: {e}", dir.display()),
            key: Some("output_dir".to_string()),
        })?;
        Ok(dir)
    }

    /// Register a cancellation token and spawn the job task
    ///
    /// The spawned task's first await is the pool slot acquisition, so the
    /// concurrency bound is enforced without blocking the submitter.
    async fn spawn_job(&self, id: JobId, url: String, output_dir: PathBuf, playlist_cap: Option<usize>) {
        let token = CancellationToken::new();
        self.pool
            .active_jobs
            .lock()
            .await
            .insert(id.clone(), token.clone());

        let downloader = self.clone();
        tokio::spawn(async move {
            let permit = downloader
                .pool
                .concurrent_limit
                .clone()
                .acquire_owned()
                .await;

            match permit {
                Ok(_permit) => match playlist_cap {
                    Some(cap) => {
                        downloader
                            .run_playlist_job(&id, &url, &output_dir, cap, &token)
                            .await
                    }
                    None => downloader.run_video_job(&id, &url, &output_dir, &token).await,
                },
                // Pool closed during shutdown; the job stays pending
                Err(_) => {
                    tracing::debug!(job_id = %id, "Pool closed before job could start");
                }
            }

            downloader.pool.active_jobs.lock().await.remove(&id);
        });
    }
}

/// Reject URLs that cannot possibly be fetched before creating a job row
fn validate_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(Error::InvalidUrl(format!(
            "{url}: unsupported scheme '{scheme}'"
        ))),
    }
}
