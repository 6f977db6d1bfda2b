//! Shared helpers for downloader tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetcher::{
    MediaFetcher, PlaylistEntry, PlaylistListing, ProgressSender, VideoMetadata,
};
use crate::types::{JobId, JobStatus};

use super::MediaDownloader;

/// Scripted stand-in for the external tool
///
/// Metadata and listings are served from in-memory maps; fetches can be
/// gated on a semaphore so tests control exactly when each one finishes.
pub(crate) struct MockFetcher {
    metadata: Mutex<HashMap<String, VideoMetadata>>,
    playlists: Mutex<HashMap<String, PlaylistListing>>,
    fail_probe: AtomicBool,
    fail_fetch_urls: Mutex<HashSet<String>>,
    /// Progress percentages every fetch reports, in order
    progress_steps: Mutex<Vec<u8>>,
    /// Each fetch consumes one permit; tests gate fetches by starting at zero
    release: Semaphore,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fetched: Mutex<Vec<String>>,
}

impl MockFetcher {
    /// Fetches complete immediately
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::build(Semaphore::MAX_PERMITS))
    }

    /// Fetches block until [`release_fetches`](Self::release_fetches) is called
    pub(crate) fn gated() -> Arc<Self> {
        Arc::new(Self::build(0))
    }

    fn build(permits: usize) -> Self {
        Self {
            metadata: Mutex::new(HashMap::new()),
            playlists: Mutex::new(HashMap::new()),
            fail_probe: AtomicBool::new(false),
            fail_fetch_urls: Mutex::new(HashSet::new()),
            progress_steps: Mutex::new(Vec::new()),
            release: Semaphore::new(permits),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn set_metadata(&self, url: &str, metadata: VideoMetadata) {
        self.metadata
            .lock()
            .unwrap()
            .insert(url.to_string(), metadata);
    }

    pub(crate) fn set_playlist(&self, url: &str, listing: PlaylistListing) {
        self.playlists
            .lock()
            .unwrap()
            .insert(url.to_string(), listing);
    }

    pub(crate) fn fail_probes(&self) {
        self.fail_probe.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_fetch_for(&self, url: &str) {
        self.fail_fetch_urls.lock().unwrap().insert(url.to_string());
    }

    pub(crate) fn set_progress_steps(&self, steps: &[u8]) {
        *self.progress_steps.lock().unwrap() = steps.to_vec();
    }

    /// Allow `count` gated fetches to proceed
    pub(crate) fn release_fetches(&self, count: usize) {
        self.release.add_permits(count);
    }

    /// URLs whose fetch ran to completion
    pub(crate) fn fetched_urls(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    /// Number of fetches currently inside the gate
    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// High-water mark of concurrent fetches
    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaFetcher for MockFetcher {
    async fn probe(&self, url: &str) -> Result<VideoMetadata> {
        if self.fail_probe.load(Ordering::SeqCst) {
            return Err(Error::ExternalTool("probe refused".to_string()));
        }
        let known = self.metadata.lock().unwrap().get(url).cloned();
        Ok(known.unwrap_or_else(|| VideoMetadata {
            title: format!("video for {url}"),
            ..VideoMetadata::default()
        }))
    }

    async fn list_playlist(&self, url: &str, max_entries: usize) -> Result<PlaylistListing> {
        let listing = self.playlists.lock().unwrap().get(url).cloned();
        match listing {
            Some(mut listing) => {
                listing.entries.truncate(max_entries);
                Ok(listing)
            }
            None => Err(Error::ExternalTool(format!("no playlist at {url}"))),
        }
    }

    async fn fetch(&self, url: &str, _template: &str, progress: ProgressSender) -> Result<()> {
        // Guard keeps the gauge honest when a gated fetch is dropped mid-await
        struct InFlight<'a>(&'a AtomicUsize);
        impl Drop for InFlight<'_> {
            fn drop(&mut self) {
                self.0.fetch_sub(1, Ordering::SeqCst);
            }
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if let Ok(permit) = self.release.acquire().await {
            permit.forget();
        }

        for percent in self.progress_steps.lock().unwrap().iter() {
            let _ = progress.send(*percent);
        }

        if self.fail_fetch_urls.lock().unwrap().contains(url) {
            return Err(Error::ExternalTool(format!("fetch refused for {url}")));
        }

        self.fetched.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// A two-member playlist listing for tests
pub(crate) fn test_listing(title: &str, member_urls: &[&str]) -> PlaylistListing {
    PlaylistListing {
        title: title.to_string(),
        description: None,
        uploader: None,
        total_count: member_urls.len(),
        entries: member_urls
            .iter()
            .map(|url| PlaylistEntry {
                url: (*url).to_string(),
                title: None,
            })
            .collect(),
    }
}

/// Build a downloader over a fresh temp directory and the given fetcher
pub(crate) async fn test_downloader(fetcher: Arc<MockFetcher>) -> (MediaDownloader, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.download.download_dir = dir.path().join("downloads");
    config.persistence.database_path = dir.path().join("test.db");

    let downloader = MediaDownloader::with_fetcher(config, fetcher).await.unwrap();
    (downloader, dir)
}

/// Poll a job until it reaches the expected status, panicking after 5 seconds
pub(crate) async fn wait_for_status(
    downloader: &MediaDownloader,
    id: &JobId,
    expected: JobStatus,
) -> crate::types::JobInfo {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let info = downloader.job_status(id).await.unwrap();
        if info.status == expected {
            return info;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} stuck in {:?}, wanted {expected:?}",
            info.status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll until the condition holds, panicking after 5 seconds
pub(crate) async fn wait_until<F: Fn() -> bool>(condition: F, what: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
