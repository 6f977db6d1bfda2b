//! Error types for media-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Job, Database, external tool failures)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::JobId;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Job lifecycle error
    #[error("job error: {0}")]
    Job(#[from] JobError),

    /// A submitted URL could not be parsed or uses an unsupported scheme
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// External tool execution failed (yt-dlp exited non-zero or produced
    /// unusable output)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// External tool exceeded its time bound
    #[error("external tool timed out after {timeout_secs}s during {operation}")]
    ToolTimeout {
        /// What the tool was doing when the timeout fired (e.g. "metadata probe")
        operation: String,
        /// The configured time bound in seconds
        timeout_secs: u64,
    },

    /// The external tool binary could not be located
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to open or create the database file
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),
}

/// Job lifecycle errors
#[derive(Debug, Error)]
pub enum JobError {
    /// Job not found in the store
    #[error("job {id} not found")]
    NotFound {
        /// The job ID that was not found
        id: JobId,
    },

    /// Requested state change violates the job state machine
    ///
    /// This indicates a logic bug if it ever fires from internal code paths;
    /// download tasks log it and carry on rather than propagating it.
    #[error("cannot transition job {id} from {from} to {to}")]
    InvalidTransition {
        /// The job whose transition was rejected
        id: JobId,
        /// The status the job currently holds
        from: String,
        /// The status that was requested
        to: String,
    },
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
/// It follows a standard format with machine-readable error codes,
/// human-readable messages, and optional contextual details.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "job_not_found",
///     "message": "job 3f2a... not found",
///     "details": {
///       "job_id": "3f2a..."
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    ///
    /// Clients can use this for programmatic error handling.
    pub code: String,

    /// Human-readable error message
    ///
    /// This is suitable for displaying to end users.
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }

    /// Create a "validation error" error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
///
/// This trait maps domain errors to appropriate HTTP status codes.
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::InvalidUrl(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,
            Error::Job(JobError::NotFound { .. }) => 404,

            // 409 Conflict - job already in a state that forbids the move
            Error::Job(JobError::InvalidTransition { .. }) => 409,

            // 500 Internal Server Error - Server-side issues
            Error::Database(_) => 500,
            Error::Sqlx(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - the external tool misbehaved
            Error::ExternalTool(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
            Error::ToolNotFound(_) => 503,

            // 504 Gateway Timeout - the external tool exceeded its time bound
            Error::ToolTimeout { .. } => 504,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidUrl(_) => "invalid_url",
            Error::Database(_) => "database_error",
            Error::Sqlx(_) => "database_error",
            Error::Job(e) => match e {
                JobError::NotFound { .. } => "job_not_found",
                JobError::InvalidTransition { .. } => "invalid_transition",
            },
            Error::ExternalTool(_) => "external_tool_error",
            Error::ToolTimeout { .. } => "tool_timeout",
            Error::ToolNotFound(_) => "tool_not_found",
            Error::Io(_) => "io_error",
            Error::NotFound(_) => "not_found",
            Error::ShuttingDown => "shutting_down",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        // Add contextual details for specific error types
        let details = match &error {
            Error::Job(JobError::NotFound { id }) => Some(serde_json::json!({
                "job_id": id,
            })),
            Error::Job(JobError::InvalidTransition { id, from, to }) => Some(serde_json::json!({
                "job_id": id,
                "from": from,
                "to": to,
            })),
            Error::ToolTimeout {
                operation,
                timeout_secs,
            } => Some(serde_json::json!({
                "operation": operation,
                "timeout_secs": timeout_secs,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
