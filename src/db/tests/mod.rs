
use crate::db::{Database, NewJob, NewVideo};
use crate::types::{JobId, JobKind};
use tempfile::NamedTempFile;

/// Open a fresh database in a temp file, returning both so the file outlives the pool
pub(crate) async fn test_db() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (db, temp_file)
}

/// Insert a pending video job with a fresh ID and return the ID
pub(crate) async fn insert_test_job(db: &Database, url: &str) -> JobId {
    let job = NewJob {
        id: JobId::new(),
        kind: JobKind::Video,
        url: url.to_string(),
    };
    db.insert_job(&job).await.unwrap();
    job.id
}

/// Build a single-video row for `job_id` with the given title
pub(crate) fn test_video(job_id: &JobId, title: &str, source_url: &str) -> NewVideo {
    NewVideo {
        id: uuid::Uuid::new_v4().to_string(),
        title: title.to_string(),
        description: format!("description of {title}"),
        duration_secs: Some(212),
        file_path: format!("downloads/{title}.mp4"),
        source_url: source_url.to_string(),
        job_id: job_id.clone(),
        playlist: None,
        pl_index: None,
    }
}
