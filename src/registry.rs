//! Job registry: the single writer of job state.
//!
//! Every job row is created and transitioned through [`JobRegistry`]. The
//! registry validates moves against the job state machine, relies on the
//! storage layer's conditional UPDATEs for atomicity, and broadcasts an
//! [`Event`] for every observable change.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::db::{Database, NewJob};
use crate::error::JobError;
use crate::types::{Event, JobId, JobInfo, JobKind, JobStatus};
use crate::utils::truncate_error;
use crate::{Error, Result};

/// Registry for creating and transitioning jobs
#[derive(Clone)]
pub struct JobRegistry {
    db: Arc<Database>,
    events: broadcast::Sender<Event>,
}

impl JobRegistry {
    /// Create a registry over a database handle and an event channel
    pub fn new(db: Arc<Database>, events: broadcast::Sender<Event>) -> Self {
        Self { db, events }
    }

    /// Create a new pending job and return its ID
    pub async fn create(&self, kind: JobKind, url: &str) -> Result<JobId> {
        let job = NewJob {
            id: JobId::new(),
            kind,
            url: url.to_string(),
        };
        self.db.insert_job(&job).await?;

        tracing::info!(job_id = %job.id, kind = %kind, url = %url, "Job created");
        self.emit(Event::JobQueued {
            id: job.id.clone(),
            kind,
            url: url.to_string(),
        });

        Ok(job.id)
    }

    /// Get a job by ID
    pub async fn get(&self, id: &JobId) -> Result<Option<JobInfo>> {
        Ok(self.db.get_job(id).await?.map(JobInfo::from))
    }

    /// Get a job by ID, failing with [`JobError::NotFound`] when absent
    pub async fn require(&self, id: &JobId) -> Result<JobInfo> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::Job(JobError::NotFound { id: id.clone() }))
    }

    /// List the most recently created jobs, newest first
    pub async fn list_recent(&self, limit: usize) -> Result<Vec<JobInfo>> {
        let rows = self.db.list_recent_jobs(limit as i64).await?;
        Ok(rows.into_iter().map(JobInfo::from).collect())
    }

    /// Move a pending job to running
    ///
    /// Fails with [`JobError::InvalidTransition`] when the job was cancelled
    /// (or otherwise moved) before the task claimed it — the task treats that
    /// as "do not start".
    pub async fn start(&self, id: &JobId) -> Result<()> {
        self.transition(id, JobStatus::Running, None).await?;
        self.emit(Event::JobStarted { id: id.clone() });
        Ok(())
    }

    /// Move a running job to completed, pinning progress to 100
    pub async fn complete(&self, id: &JobId) -> Result<()> {
        self.transition(id, JobStatus::Completed, None).await?;
        self.emit(Event::JobCompleted { id: id.clone() });
        Ok(())
    }

    /// Move a running job to failed with a (truncated) error message
    pub async fn fail(&self, id: &JobId, error: &str) -> Result<()> {
        let message = truncate_error(error);
        self.transition(id, JobStatus::Failed, Some(&message))
            .await?;
        self.emit(Event::JobFailed {
            id: id.clone(),
            error: message,
        });
        Ok(())
    }

    /// Cancel a job if it is still pending or running
    ///
    /// Returns `true` when the job was cancelled by this call, `false` when
    /// it is unknown or already terminal. Cooperative: a running task
    /// observes the cancel through its token and through the transition
    /// guards, not through interruption.
    pub async fn cancel(&self, id: &JobId) -> Result<bool> {
        let cancelled = self.db.cancel_job(id).await?;
        if cancelled {
            tracing::info!(job_id = %id, "Job cancelled");
            self.emit(Event::JobCancelled { id: id.clone() });
        }
        Ok(cancelled)
    }

    /// Report progress for a running job
    ///
    /// Values that do not strictly increase the stored progress are ignored,
    /// as are reports against jobs that are no longer running. Emits a
    /// progress event only when the stored value actually changed.
    pub async fn update_progress(&self, id: &JobId, percent: u8) -> Result<()> {
        let changed = self.db.update_job_progress(id, percent).await?;
        if changed > 0 {
            self.emit(Event::JobProgress {
                id: id.clone(),
                percent: percent.min(100),
            });
        }
        Ok(())
    }

    /// Fail every job left in the running state by a previous process
    ///
    /// Called once at startup, before the execution pool accepts work.
    pub async fn fail_stale_running_jobs(&self) -> Result<u64> {
        let reconciled = self.db.fail_stale_running_jobs().await?;
        if reconciled > 0 {
            tracing::warn!(
                count = reconciled,
                "Reconciled stale running jobs from a previous process"
            );
        }
        Ok(reconciled)
    }

    /// Access the underlying database handle
    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    async fn transition(&self, id: &JobId, to: JobStatus, error: Option<&str>) -> Result<()> {
        let changed = self.db.transition_job(id, to, error).await?;
        if changed > 0 {
            return Ok(());
        }

        // Zero rows: the guard rejected the move. Fetch the row to tell the
        // caller whether the job is missing or just in the wrong state.
        match self.db.get_job(id).await? {
            None => Err(Error::Job(JobError::NotFound { id: id.clone() })),
            Some(row) => Err(Error::Job(JobError::InvalidTransition {
                id: id.clone(),
                from: row.status,
                to: to.as_str().to_string(),
            })),
        }
    }

    fn emit(&self, event: Event) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    async fn test_registry() -> (JobRegistry, broadcast::Receiver<Event>, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db = Arc::new(Database::new(temp_file.path()).await.unwrap());
        let (tx, rx) = broadcast::channel(64);
        (JobRegistry::new(db, tx), rx, temp_file)
    }

    #[tokio::test]
    async fn create_produces_a_pending_job_and_queued_event() {
        let (registry, mut events, _file) = test_registry().await;

        let id = registry
            .create(JobKind::Video, "https://example.com/v")
            .await
            .unwrap();

        let info = registry.require(&id).await.unwrap();
        assert_eq!(info.status, JobStatus::Pending);
        assert_eq!(info.progress, 0);
        assert_eq!(info.kind, JobKind::Video);

        match events.recv().await.unwrap() {
            Event::JobQueued { id: ev_id, kind, url } => {
                assert_eq!(ev_id, id);
                assert_eq!(kind, JobKind::Video);
                assert_eq!(url, "https://example.com/v");
            }
            other => panic!("expected JobQueued, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn concurrent_creates_yield_unique_ids() {
        let (registry, _events, _file) = test_registry().await;

        let mut handles = Vec::new();
        for i in 0..20 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .create(JobKind::Video, &format!("https://example.com/{i}"))
                    .await
                    .unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        let before = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), before, "every submission must get a distinct id");
    }

    #[tokio::test]
    async fn full_lifecycle_to_completed() {
        let (registry, _events, _file) = test_registry().await;
        let id = registry
            .create(JobKind::Video, "https://example.com/v")
            .await
            .unwrap();

        registry.start(&id).await.unwrap();
        registry.update_progress(&id, 50).await.unwrap();
        registry.complete(&id).await.unwrap();

        let info = registry.require(&id).await.unwrap();
        assert_eq!(info.status, JobStatus::Completed);
        assert_eq!(info.progress, 100);
        assert!(info.completed_at.is_some());
        assert!(info.error_message.is_none());
    }

    #[tokio::test]
    async fn fail_truncates_long_error_messages() {
        let (registry, _events, _file) = test_registry().await;
        let id = registry
            .create(JobKind::Video, "https://example.com/v")
            .await
            .unwrap();
        registry.start(&id).await.unwrap();

        let long_error = "e".repeat(5000);
        registry.fail(&id, &long_error).await.unwrap();

        let info = registry.require(&id).await.unwrap();
        assert_eq!(info.status, JobStatus::Failed);
        assert_eq!(
            info.error_message.unwrap().chars().count(),
            crate::utils::MAX_STORED_TEXT_LEN
        );
    }

    #[tokio::test]
    async fn start_after_cancel_is_an_invalid_transition() {
        let (registry, _events, _file) = test_registry().await;
        let id = registry
            .create(JobKind::Video, "https://example.com/v")
            .await
            .unwrap();

        assert!(registry.cancel(&id).await.unwrap());

        let err = registry.start(&id).await.unwrap_err();
        match err {
            Error::Job(JobError::InvalidTransition { from, to, .. }) => {
                assert_eq!(from, "cancelled");
                assert_eq!(to, "running");
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn operations_on_unknown_job_report_not_found() {
        let (registry, _events, _file) = test_registry().await;
        let ghost = JobId::from("ghost");

        match registry.start(&ghost).await.unwrap_err() {
            Error::Job(JobError::NotFound { id }) => assert_eq!(id, ghost),
            other => panic!("expected NotFound, got {other:?}"),
        }

        match registry.require(&ghost).await.unwrap_err() {
            Error::Job(JobError::NotFound { .. }) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }

        assert!(!registry.cancel(&ghost).await.unwrap());
    }

    #[tokio::test]
    async fn cancel_of_terminal_job_returns_false_and_emits_nothing() {
        let (registry, mut events, _file) = test_registry().await;
        let id = registry
            .create(JobKind::Video, "https://example.com/v")
            .await
            .unwrap();
        registry.start(&id).await.unwrap();
        registry.complete(&id).await.unwrap();

        // Drain events emitted so far
        while events.try_recv().is_ok() {}

        assert!(!registry.cancel(&id).await.unwrap());
        assert!(
            events.try_recv().is_err(),
            "a no-op cancel must not broadcast JobCancelled"
        );

        let info = registry.require(&id).await.unwrap();
        assert_eq!(info.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn progress_events_fire_only_on_actual_change() {
        let (registry, mut events, _file) = test_registry().await;
        let id = registry
            .create(JobKind::Video, "https://example.com/v")
            .await
            .unwrap();
        registry.start(&id).await.unwrap();
        while events.try_recv().is_ok() {}

        registry.update_progress(&id, 25).await.unwrap();
        registry.update_progress(&id, 25).await.unwrap();
        registry.update_progress(&id, 10).await.unwrap();

        match events.try_recv().unwrap() {
            Event::JobProgress { percent, .. } => assert_eq!(percent, 25),
            other => panic!("expected JobProgress, got {other:?}"),
        }
        assert!(
            events.try_recv().is_err(),
            "non-increasing reports must not broadcast"
        );
    }

    #[tokio::test]
    async fn list_recent_maps_rows_to_info() {
        let (registry, _events, _file) = test_registry().await;

        for i in 0..3 {
            registry
                .create(JobKind::Playlist, &format!("https://example.com/{i}"))
                .await
                .unwrap();
        }

        let recent = registry.list_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|j| j.status == JobStatus::Pending));
        assert!(recent.iter().all(|j| j.kind == JobKind::Playlist));
    }
}
