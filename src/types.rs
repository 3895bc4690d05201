//! Core types for media-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::Quality;

/// Unique identifier for a download task
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadId(pub i64);

impl DownloadId {
    /// Create a new DownloadId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for DownloadId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<DownloadId> for i64 {
    fn from(id: DownloadId) -> Self {
        id.0
    }
}

impl std::fmt::Display for DownloadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DownloadId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Kind of media a request resolves to
///
/// Video and audio are delegated to the external resolver binary; images are
/// fetched directly over HTTP.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Full video download (default)
    #[default]
    Video,
    /// Audio-only extraction
    Audio,
    /// Raw image fetch over HTTP
    Image,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Image => write!(f, "image"),
        }
    }
}

/// Task status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Accepted and waiting for a worker slot
    Queued,
    /// Worker is executing the download
    Running,
    /// Finished successfully
    Complete,
    /// Finished with an error
    Failed,
    /// Cancelled by the host
    Cancelled,
}

impl Status {
    /// Whether this status is terminal (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Complete | Status::Failed | Status::Cancelled)
    }
}

/// A download request as submitted by the host
///
/// Immutable once submitted; a new request produces a new task with its own
/// [`TaskHandle`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// Source URL
    pub url: String,

    /// What to resolve the URL into
    pub kind: MediaKind,

    /// Directory the result is saved to
    pub output_dir: PathBuf,

    /// Quality override (None = use the configured default)
    #[serde(default)]
    pub quality: Option<Quality>,
}

impl DownloadRequest {
    /// Create a request with the default quality
    pub fn new(url: impl Into<String>, kind: MediaKind, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            kind,
            output_dir: output_dir.into(),
            quality: None,
        }
    }
}

/// Opaque reference to a submitted task
///
/// Returned by `submit` and accepted by `cancel`. Cloneable; all clones refer
/// to the same task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    pub(crate) id: DownloadId,
}

impl TaskHandle {
    /// The task's download ID (matches the `id` field on its events)
    pub fn id(&self) -> DownloadId {
        self.id
    }
}

/// Event emitted during a task's lifecycle
///
/// Every variant except `Shutdown` carries the [`DownloadId`] of the task it
/// belongs to, so subscribers can demultiplex the shared stream. Exactly one
/// of `Complete`/`Failed`/`Cancelled` is emitted per task, after all of its
/// `Progress` events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Task accepted and registered
    Queued {
        /// Download ID
        id: DownloadId,
        /// Source URL
        url: String,
    },

    /// Worker picked the task up and started executing
    Started {
        /// Download ID
        id: DownloadId,
    },

    /// Progress update
    Progress {
        /// Download ID
        id: DownloadId,
        /// Progress percentage (0.0 to 100.0), None when the total is unknown
        #[serde(default, skip_serializing_if = "Option::is_none")]
        percent: Option<f32>,
        /// Human-readable status line
        message: String,
    },

    /// Informational output suitable for a host's text log
    Log {
        /// Download ID
        id: DownloadId,
        /// Log line
        message: String,
    },

    /// Task finished successfully
    Complete {
        /// Download ID
        id: DownloadId,
        /// Final file path, when the resolver reported one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },

    /// Task finished with an error
    Failed {
        /// Download ID
        id: DownloadId,
        /// Error message
        error: String,
    },

    /// Task was cancelled by the host
    Cancelled {
        /// Download ID
        id: DownloadId,
    },

    /// Graceful shutdown initiated
    Shutdown,
}

impl Event {
    /// The download ID this event belongs to (None for `Shutdown`)
    pub fn download_id(&self) -> Option<DownloadId> {
        match self {
            Event::Queued { id, .. }
            | Event::Started { id }
            | Event::Progress { id, .. }
            | Event::Log { id, .. }
            | Event::Complete { id, .. }
            | Event::Failed { id, .. }
            | Event::Cancelled { id } => Some(*id),
            Event::Shutdown => None,
        }
    }

    /// Whether this event terminates its task's stream
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::Complete { .. } | Event::Failed { .. } | Event::Cancelled { .. }
        )
    }
}

/// Snapshot of a task for host polling
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadInfo {
    /// Unique task identifier
    pub id: DownloadId,

    /// Source URL
    pub url: String,

    /// Media kind
    pub kind: MediaKind,

    /// Current status
    pub status: Status,

    /// Last observed progress percentage (0.0 to 100.0)
    pub progress: f32,

    /// Output directory the result is saved to
    pub output_dir: PathBuf,

    /// When the task was submitted
    pub created_at: DateTime<Utc>,

    /// When the worker started executing (None while queued)
    pub started_at: Option<DateTime<Utc>>,

    /// When the task reached a terminal status
    pub finished_at: Option<DateTime<Utc>>,
}

/// Progress report produced by a resolver or fetcher
///
/// Internal wire format between the executing side and the progress bridge;
/// the bridge translates these into [`Event::Progress`] / [`Event::Log`].
#[derive(Clone, Debug)]
pub struct ProgressUpdate {
    /// Progress percentage (0.0 to 100.0), None when unknown
    pub percent: Option<f32>,
    /// Human-readable status line
    pub message: String,
}

impl ProgressUpdate {
    /// A percentage update with a formatted default message
    pub fn percent(percent: f32) -> Self {
        Self {
            percent: Some(percent),
            message: format!("{percent:.1}%"),
        }
    }

    /// A message-only update (no percentage known)
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            percent: None,
            message: message.into(),
        }
    }
}
