//! Core downloader implementation split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by domain:
//! - [`control`] - Job submission, cancellation and shutdown
//! - [`download_task`] - Video and playlist task execution
//! - [`queries`] - Status, listing and metadata queries

mod control;
mod download_task;
mod queries;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::fetcher::{MediaFetcher, YtDlpFetcher};
use crate::registry::JobRegistry;
use crate::types::{Event, JobId};

/// Execution pool state: concurrency bound and active-task tracking
#[derive(Clone)]
pub(crate) struct PoolState {
    /// Semaphore to limit concurrent tasks (respects max_concurrent_jobs config)
    pub(crate) concurrent_limit: Arc<Semaphore>,
    /// Map of in-flight jobs to their cancellation tokens
    pub(crate) active_jobs: Arc<Mutex<HashMap<JobId, CancellationToken>>>,
    /// Flag to indicate whether new jobs are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct MediaDownloader {
    /// Database instance for persistence (wrapped in Arc for sharing across tasks)
    /// Public for integration tests to query job state
    pub db: Arc<Database>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// External tool abstraction (trait object for pluggable implementations)
    pub(crate) fetcher: Arc<dyn MediaFetcher>,
    /// Job registry: the single writer of job state
    pub(crate) registry: JobRegistry,
    /// Execution pool state
    pub(crate) pool: PoolState,
}

impl MediaDownloader {
    /// Create a new MediaDownloader instance
    ///
    /// This initializes all core components:
    /// - Validates the configuration
    /// - Opens/creates the SQLite database and runs migrations
    /// - Locates the yt-dlp binary (explicit path or PATH search)
    /// - Fails any jobs left running by a previous process
    /// - Sets up the event broadcast channel and execution pool
    pub async fn new(config: Config) -> Result<Self> {
        let fetcher: Arc<dyn MediaFetcher> = Arc::new(YtDlpFetcher::from_config(&config.tool)?);
        Self::with_fetcher(config, fetcher).await
    }

    /// Create a downloader with an explicit fetcher implementation
    ///
    /// This is the seam tests use to substitute the external tool.
    pub async fn with_fetcher(config: Config, fetcher: Arc<dyn MediaFetcher>) -> Result<Self> {
        config.validate()?;

        // Ensure the download directory exists
        tokio::fs::create_dir_all(config.download_dir())
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download_dir().display(),
                        e
                    ),
                ))
            })?;

        let db = Arc::new(Database::new(config.database_path()).await?);

        // Create broadcast channel with buffer size of 1000 events
        // This allows multiple subscribers to receive all events independently
        let (event_tx, _rx) = broadcast::channel(1000);

        let registry = JobRegistry::new(db.clone(), event_tx.clone());

        // A row still marked running belongs to a dead process
        registry.fail_stale_running_jobs().await?;

        let pool = PoolState {
            concurrent_limit: Arc::new(Semaphore::new(config.download.max_concurrent_jobs)),
            active_jobs: Arc::new(Mutex::new(HashMap::new())),
            accepting_new: Arc::new(AtomicBool::new(true)),
        };

        Ok(Self {
            db,
            event_tx,
            config: Arc::new(config),
            fetcher,
            registry,
            pool,
        })
    }

    /// Subscribe to job events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events
    /// independently. Events are buffered, but if a subscriber falls behind by
    /// more than 1000 events, it will receive a `RecvError::Lagged` error.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    ///
    /// The configuration is wrapped in an Arc, so this is a cheap clone.
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server runs concurrently with job processing and listens on the
    /// configured bind address (default: 127.0.0.1:7788).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
