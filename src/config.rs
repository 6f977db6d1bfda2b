//! Configuration types for media-dl

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use url::Url;
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Download behavior configuration (output directory, concurrency, playlist caps)
///
/// Groups settings related to how jobs are executed and where files land.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Download directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Maximum concurrent jobs (default: 3)
    ///
    /// Submissions beyond this bound queue on the execution pool; none are
    /// rejected or dropped.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_jobs: usize,

    /// Default cap on playlist members when the caller does not pass one (default: 10)
    #[serde(default = "default_max_playlist_videos")]
    pub default_max_playlist_videos: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_jobs: default_max_concurrent(),
            default_max_playlist_videos: default_max_playlist_videos(),
        }
    }
}

/// External tool configuration (yt-dlp path and per-invocation time bounds)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolConfig {
    /// Path to the yt-dlp executable (auto-detected via PATH if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Whether to search PATH for the tool when no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Time bound for a metadata probe (default: 30 seconds)
    #[serde(default = "default_metadata_timeout", with = "duration_serde")]
    pub metadata_timeout: Duration,

    /// Time bound for a flat playlist listing (default: 60 seconds)
    #[serde(default = "default_listing_timeout", with = "duration_serde")]
    pub listing_timeout: Duration,

    /// Time bound for a single content fetch (default: 300 seconds)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub fetch_timeout: Duration,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            search_path: true,
            metadata_timeout: default_metadata_timeout(),
            listing_timeout: default_listing_timeout(),
            fetch_timeout: default_fetch_timeout(),
        }
    }
}

/// Data storage configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PersistenceConfig {
    /// Database path (default: "./media-dl.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Default limit for recent-job listings (default: 20)
    #[serde(default = "default_recent_limit")]
    pub recent_jobs_limit: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            recent_jobs_limit: default_recent_limit(),
        }
    }
}

/// API and external server integration configuration
///
/// Groups settings for external access and control interfaces.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ServerIntegrationConfig {
    /// REST API configuration
    #[serde(default)]
    pub api: ApiConfig,
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:7788)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Main configuration for MediaDownloader
///
/// Fields are organized into logical sub-configs:
/// - [`download`](DownloadConfig) — output directory, concurrency, playlist caps
/// - [`tool`](ToolConfig) — yt-dlp path and per-invocation time bounds
/// - [`persistence`](PersistenceConfig) — database path and listing defaults
/// - [`server`](ServerIntegrationConfig) — REST API settings
///
/// Sub-config fields are flattened for serialization, so the JSON/TOML format
/// stays flat apart from the `persistence` and `api` sections.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// External tool settings
    #[serde(flatten)]
    pub tool: ToolConfig,

    /// Data storage settings
    pub persistence: PersistenceConfig,

    /// API and external server integration
    #[serde(flatten)]
    pub server: ServerIntegrationConfig,
}

impl Config {
    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Database path
    pub fn database_path(&self) -> &PathBuf {
        &self.persistence.database_path
    }

    /// Check the configuration for values that cannot work at runtime
    ///
    /// Called once by the constructor before anything is spawned, so a bad
    /// config fails loudly instead of producing jobs that can never run.
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_jobs == 0 {
            return Err(Error::Config {
                message: "max_concurrent_jobs must be at least 1".into(),
                key: Some("max_concurrent_jobs".into()),
            });
        }

        if self.download.default_max_playlist_videos == 0 {
            return Err(Error::Config {
                message: "default_max_playlist_videos must be at least 1".into(),
                key: Some("default_max_playlist_videos".into()),
            });
        }

        if self.download.download_dir.as_os_str().is_empty() {
            return Err(Error::Config {
                message: "download_dir must not be empty".into(),
                key: Some("download_dir".into()),
            });
        }

        if self.persistence.database_path.as_os_str().is_empty() {
            return Err(Error::Config {
                message: "database_path must not be empty".into(),
                key: Some("database_path".into()),
            });
        }

        for timeout in [
            ("metadata_timeout", self.tool.metadata_timeout),
            ("listing_timeout", self.tool.listing_timeout),
            ("fetch_timeout", self.tool.fetch_timeout),
        ] {
            if timeout.1.is_zero() {
                return Err(Error::Config {
                    message: format!("{} must be greater than zero", timeout.0),
                    key: Some(timeout.0.into()),
                });
            }
        }

        for origin in &self.server.api.cors_origins {
            if origin != "*" && Url::parse(origin).is_err() {
                return Err(Error::Config {
                    message: format!("invalid CORS origin: {origin}"),
                    key: Some("cors_origins".into()),
                });
            }
        }

        Ok(())
    }
}

// Default value functions
fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_max_concurrent() -> usize {
    3
}

fn default_max_playlist_videos() -> usize {
    10
}

fn default_database_path() -> PathBuf {
    PathBuf::from("media-dl.db")
}

fn default_recent_limit() -> usize {
    20
}

fn default_true() -> bool {
    true
}

fn default_metadata_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_listing_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(300) // 5 minutes
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7788))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
