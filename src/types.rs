//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a job
///
/// Job IDs are opaque UUID v4 tokens. They are generated once per submission
/// and never reused, even across process restarts.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a fresh random job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

impl PartialEq<str> for JobId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for JobId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Implement sqlx Type, Encode, and Decode for database operations
impl sqlx::Type<sqlx::Sqlite> for JobId {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }

    fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for JobId {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for JobId {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let id = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Self(id))
    }
}

/// Kind of work a job performs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Download of a single video
    Video,
    /// Download of up to N members of a playlist
    Playlist,
}

impl JobKind {
    /// Stable string code stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Video => "video",
            JobKind::Playlist => "playlist",
        }
    }

    /// Convert a stored string code back to a JobKind
    pub fn from_str(kind: &str) -> Self {
        match kind {
            "playlist" => JobKind::Playlist,
            // Default to Video for unknown kinds
            _ => JobKind::Video,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job lifecycle status
///
/// The state machine is: `pending → running → {completed, failed}`, with
/// `cancelled` reachable from `pending` and `running`. The three terminal
/// states absorb all further transition attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted but not yet started
    Pending,
    /// A task is actively working on the job
    Running,
    /// Finished successfully (progress is pinned to 100)
    Completed,
    /// Finished with an error (error_message is set)
    Failed,
    /// Cancelled before completion
    Cancelled,
}

impl JobStatus {
    /// Stable string code stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Convert a stored string code back to a JobStatus
    pub fn from_str(status: &str) -> Self {
        match status {
            "pending" => JobStatus::Pending,
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            "cancelled" => JobStatus::Cancelled,
            // Default to Failed for unknown status so corrupted rows surface visibly
            _ => JobStatus::Failed,
        }
    }

    /// Whether this status is terminal (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether the state machine permits moving from `self` to `to`
    pub fn can_transition_to(&self, to: JobStatus) -> bool {
        match (self, to) {
            (JobStatus::Pending, JobStatus::Running) => true,
            (JobStatus::Pending, JobStatus::Cancelled) => true,
            (JobStatus::Running, JobStatus::Completed) => true,
            (JobStatus::Running, JobStatus::Failed) => true,
            (JobStatus::Running, JobStatus::Cancelled) => true,
            _ => false,
        }
    }

    /// The statuses a conditional UPDATE may move to `to` from
    ///
    /// Used to build `WHERE status IN (...)` guards so transitions stay
    /// atomic at the storage layer.
    pub fn allowed_sources(to: JobStatus) -> &'static [JobStatus] {
        match to {
            JobStatus::Running => &[JobStatus::Pending],
            JobStatus::Completed | JobStatus::Failed => &[JobStatus::Running],
            JobStatus::Cancelled => &[JobStatus::Pending, JobStatus::Running],
            JobStatus::Pending => &[],
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job accepted and persisted as pending
    JobQueued {
        /// Job ID
        id: JobId,
        /// Kind of job
        kind: JobKind,
        /// Source URL
        url: String,
    },

    /// Job picked up by a worker task
    JobStarted {
        /// Job ID
        id: JobId,
    },

    /// Job progress update
    JobProgress {
        /// Job ID
        id: JobId,
        /// Progress percentage (0 to 100)
        percent: u8,
    },

    /// A video row was recorded for the job
    VideoRecorded {
        /// Job ID
        id: JobId,
        /// Video title
        title: String,
        /// Expected file path
        path: PathBuf,
    },

    /// Job finished successfully
    JobCompleted {
        /// Job ID
        id: JobId,
    },

    /// Job finished with an error
    JobFailed {
        /// Job ID
        id: JobId,
        /// Error message
        error: String,
    },

    /// Job cancelled before completion
    JobCancelled {
        /// Job ID
        id: JobId,
    },

    /// Graceful shutdown initiated
    Shutdown,
}

/// Information about a tracked job
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobInfo {
    /// Unique job identifier
    pub id: JobId,

    /// Kind of job (video or playlist)
    pub kind: JobKind,

    /// Source URL the job was submitted with
    pub url: String,

    /// Current status
    pub status: JobStatus,

    /// Progress percentage (0 to 100)
    pub progress: u8,

    /// Error message (set exactly when status is failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// When the job was submitted
    pub created_at: DateTime<Utc>,

    /// When the job reached a terminal state (None while pending/running)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A recorded video row
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct VideoInfo {
    /// Unique video identifier
    pub id: String,

    /// Video title as reported by the source
    pub title: String,

    /// Description (capped at 1000 characters)
    pub description: String,

    /// Duration in seconds (None when the source does not report one)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<i64>,

    /// Expected path of the downloaded file
    pub file_path: PathBuf,

    /// Source URL of the individual video
    pub source_url: String,

    /// The job that produced this row
    pub job_id: JobId,

    /// Playlist title (None for single-video jobs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playlist: Option<String>,

    /// 1-based position within the playlist (None for single-video jobs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,

    /// When the row was recorded
    pub created_at: DateTime<Utc>,
}

/// Live video metadata joined with local download state
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct VideoMetadataReport {
    /// The URL that was probed
    pub url: String,

    /// Video title
    pub title: String,

    /// Description (capped at 500 characters in this report)
    pub description: String,

    /// Duration in seconds (None when unknown)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<i64>,

    /// Uploader / channel name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,

    /// Upload date as reported by the source (YYYYMMDD)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,

    /// View count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<i64>,

    /// Like count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_count: Option<i64>,

    /// Number of formats the source offers
    pub format_count: usize,

    /// Whether a completed job has recorded this URL locally
    pub downloaded: bool,

    /// Recorded file path (when downloaded)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
}

/// Live playlist metadata joined with locally recorded member rows
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PlaylistMetadataReport {
    /// The URL that was probed
    pub url: String,

    /// Playlist title
    pub title: String,

    /// Playlist description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Uploader / channel name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,

    /// Total member count as reported by the source
    pub member_count: usize,

    /// Locally recorded members of this playlist, ordered by position
    pub downloaded_items: Vec<PlaylistItemInfo>,
}

/// A locally recorded playlist member
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PlaylistItemInfo {
    /// 1-based position within the playlist
    pub position: i64,

    /// Video title
    pub title: String,

    /// Expected path of the downloaded file
    pub file_path: PathBuf,

    /// When the row was recorded
    pub created_at: DateTime<Utc>,
}
