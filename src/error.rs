//! Error types for media-dl
//!
//! Validation problems surface synchronously from `submit`; everything that
//! happens after a task is accepted surfaces asynchronously as a terminal
//! `Failed` event carrying the error's display message.

use thiserror::Error;

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input caught before a worker is spawned
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable description of what is invalid
        message: String,
        /// The request field that failed validation (e.g., "url", "output_dir")
        field: Option<String>,
    },

    /// Task lifecycle error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// External resolver binary execution failed (spawn failure or non-zero exit)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing resolver binary)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Network error from the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Identical request already running (see `reject_duplicate_active`)
    #[error("duplicate download: {0}")]
    Duplicate(String),

    /// Shutdown in progress - not accepting new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Construct a validation error for a named request field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

/// Task lifecycle errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Task not known to this downloader instance
    #[error("download {id} not found")]
    NotFound {
        /// The download ID that was not found
        id: i64,
    },
}
