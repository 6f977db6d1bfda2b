//! Job rows: insert, conditional transitions, listing.
//!
//! All state changes go through conditional `UPDATE ... WHERE status IN (...)`
//! statements, so a transition that races with a concurrent cancel or a second
//! worker affects zero rows instead of clobbering the newer state.

use crate::error::DatabaseError;
use crate::types::{JobId, JobStatus};
use crate::{Error, Result};

use super::{Database, JobRow, NewJob};

const JOB_COLUMNS: &str =
    "id, kind, url, status, progress, error_message, created_at, completed_at";

impl Database {
    /// Insert a new job record in the pending state
    pub async fn insert_job(&self, job: &NewJob) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO jobs (id, kind, url, status, progress, created_at)
            VALUES (?, ?, ?, 'pending', 0, ?)
            "#,
        )
        .bind(&job.id)
        .bind(job.kind.as_str())
        .bind(&job.url)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert job: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Get a job by ID
    pub async fn get_job(&self, id: &JobId) -> Result<Option<JobRow>> {
        let row = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get job: {}",
                e
            )))
        })?;

        Ok(row)
    }

    /// List the most recently created jobs, newest first
    pub async fn list_recent_jobs(&self, limit: i64) -> Result<Vec<JobRow>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs ORDER BY created_at DESC, rowid DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list jobs: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Attempt a status transition, returning the number of rows changed
    ///
    /// The UPDATE only matches rows whose current status permits the move, so
    /// a return of 0 means the job either doesn't exist or is in a state the
    /// transition is not allowed from. Terminal statuses set `completed_at`;
    /// a move to `completed` pins progress to 100; a move to `failed` stores
    /// the error message.
    pub async fn transition_job(
        &self,
        id: &JobId,
        to: JobStatus,
        error: Option<&str>,
    ) -> Result<u64> {
        let sources = JobStatus::allowed_sources(to);
        if sources.is_empty() {
            return Ok(0);
        }

        // Status codes are fixed crate-internal strings, never user input
        let source_list = sources
            .iter()
            .map(|s| format!("'{}'", s.as_str()))
            .collect::<Vec<_>>()
            .join(", ");

        let now = chrono::Utc::now().timestamp();

        let completed_sql = format!(
            "UPDATE jobs SET status = ?, progress = 100, completed_at = ? \
             WHERE id = ? AND status IN ({source_list})"
        );
        let failed_sql = format!(
            "UPDATE jobs SET status = ?, error_message = ?, completed_at = ? \
             WHERE id = ? AND status IN ({source_list})"
        );
        let other_sql =
            format!("UPDATE jobs SET status = ? WHERE id = ? AND status IN ({source_list})");

        let query = match to {
            JobStatus::Completed => sqlx::query(&completed_sql)
                .bind(to.as_str())
                .bind(now)
                .bind(id),
            JobStatus::Failed | JobStatus::Cancelled => sqlx::query(&failed_sql)
                .bind(to.as_str())
                .bind(error)
                .bind(now)
                .bind(id),
            _ => sqlx::query(&other_sql).bind(to.as_str()).bind(id),
        };

        let result = query.execute(&self.pool).await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to transition job: {}",
                e
            )))
        })?;

        Ok(result.rows_affected())
    }

    /// Update job progress, returning the number of rows changed
    ///
    /// Only applies to running jobs and only when the new value is strictly
    /// larger, keeping progress monotonic under concurrent reporters.
    pub async fn update_job_progress(&self, id: &JobId, progress: u8) -> Result<u64> {
        let progress = progress.min(100) as i64;

        let result = sqlx::query(
            "UPDATE jobs SET progress = ? WHERE id = ? AND status = 'running' AND progress < ?",
        )
        .bind(progress)
        .bind(id)
        .bind(progress)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update progress: {}",
                e
            )))
        })?;

        Ok(result.rows_affected())
    }

    /// Cancel a job if it is still pending or running
    ///
    /// Returns `true` when the single conditional UPDATE changed the row,
    /// `false` when the job is unknown or already terminal.
    pub async fn cancel_job(&self, id: &JobId) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            "UPDATE jobs SET status = 'cancelled', completed_at = ? \
             WHERE id = ? AND status IN ('pending', 'running')",
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to cancel job: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Fail every job still marked running, returning how many were changed
    ///
    /// Run once at startup: a running row with no live process behind it can
    /// only be left over from a previous process that died mid-job.
    pub async fn fail_stale_running_jobs(&self) -> Result<u64> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            "UPDATE jobs SET status = 'failed', error_message = ?, completed_at = ? \
             WHERE status = 'running'",
        )
        .bind("interrupted by process restart")
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to reconcile stale jobs: {}",
                e
            )))
        })?;

        Ok(result.rows_affected())
    }
}
