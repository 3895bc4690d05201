//! Configuration types for media-dl

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Download behavior configuration (directory, concurrency, quality)
///
/// Groups settings related to how downloads are stored and scheduled.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Download directory (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Maximum concurrent downloads (default: 1, one at a time)
    ///
    /// Submissions beyond the limit are admitted and wait for a worker slot;
    /// they are not rejected.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// Default quality for requests that don't override it
    #[serde(default)]
    pub quality: Quality,

    /// File collision handling for image downloads
    #[serde(default)]
    pub file_collision: FileCollisionAction,

    /// Reject a submit whose (url, kind, output_dir) matches an active task (default: true)
    ///
    /// When disabled, identical requests run as independent tasks with their
    /// own handles and event streams.
    #[serde(default = "default_true")]
    pub reject_duplicate_active: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            quality: Quality::default(),
            file_collision: FileCollisionAction::default(),
            reject_duplicate_active: true,
        }
    }
}

/// External resolver binary configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Whether to search PATH for the resolver binary if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            search_path: true,
        }
    }
}

/// HTTP client configuration (image downloads)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Overall request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_secs")]
    pub request_timeout: Duration,

    /// Connection timeout (default: 10 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_secs")]
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

/// Main configuration for [`MediaDownloader`](crate::MediaDownloader)
///
/// Fields are organized into logical sub-configs:
/// - [`download`](DownloadConfig) — directory, concurrency, quality
/// - [`tools`](ToolsConfig) — resolver binary discovery
/// - [`http`](HttpConfig) — HTTP client timeouts
///
/// All sub-config fields are flattened, so the serialized JSON stays flat
/// (no nesting) and every field is optional with a sensible default.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior settings
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// Resolver binary settings
    #[serde(flatten)]
    pub tools: ToolsConfig,

    /// HTTP client settings
    #[serde(flatten)]
    pub http: HttpConfig,
}

impl Config {
    /// Download directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Load configuration from a JSON file
    ///
    /// Missing fields fall back to their defaults, so a partial settings file
    /// (or one written by an older version) loads cleanly.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file (pretty-printed)
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::validation(
                "max_concurrent_downloads",
                "max_concurrent_downloads must be at least 1",
            ));
        }
        if self.http.request_timeout.is_zero() {
            return Err(Error::validation(
                "request_timeout",
                "request_timeout must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Quality selection, mapped by the resolver to format arguments
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Best available quality (default)
    #[default]
    Best,
    /// Capped quality (720p video / 128kbps-class audio)
    Medium,
    /// Low quality (480p video / low-bitrate audio)
    Low,
}

/// File collision handling strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCollisionAction {
    /// Append (1), (2), etc. to the filename (default)
    #[default]
    Rename,
    /// Overwrite the existing file
    Overwrite,
    /// Skip the download, keep the existing file
    Skip,
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_max_concurrent() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Serialize/deserialize Duration as whole seconds
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
