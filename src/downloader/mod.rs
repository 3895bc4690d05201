//! Core downloader implementation split into focused submodules.
//!
//! The `MediaDownloader` struct and its methods are organized by domain:
//! - [`submit`] - Request validation and task admission
//! - [`control`] - Task lifecycle control (cancel, snapshots, shutdown)
//! - [`task`] - Worker execution and the progress bridge

mod control;
mod submit;
mod task;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::resolver::{CliResolver, MediaResolver, ResolverCapabilities, UnavailableResolver};
use crate::types::{DownloadId, DownloadInfo, Event};

/// Task registry and execution state
#[derive(Clone)]
pub(crate) struct TaskState {
    /// All known tasks, keyed by ID (protected by Mutex)
    pub(crate) registry: std::sync::Arc<
        tokio::sync::Mutex<std::collections::HashMap<DownloadId, DownloadInfo>>,
    >,
    /// Map of non-terminal tasks to their cancellation tokens
    pub(crate) active: std::sync::Arc<
        tokio::sync::Mutex<
            std::collections::HashMap<DownloadId, tokio_util::sync::CancellationToken>,
        >,
    >,
    /// Semaphore to limit concurrent downloads (respects max_concurrent_downloads config)
    pub(crate) concurrent_limit: std::sync::Arc<tokio::sync::Semaphore>,
    /// Flag to indicate whether new downloads are accepted (set to false during shutdown)
    pub(crate) accepting_new: std::sync::Arc<std::sync::atomic::AtomicBool>,
    /// Monotonic task ID counter
    pub(crate) next_id: std::sync::Arc<std::sync::atomic::AtomicI64>,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct MediaDownloader {
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: std::sync::Arc<Config>,
    /// Shared HTTP client for image downloads
    pub(crate) http_client: reqwest::Client,
    /// URL-to-media resolver (trait object for pluggable implementations)
    pub(crate) resolver: std::sync::Arc<dyn MediaResolver>,
    /// Task registry and execution state
    pub(crate) tasks: TaskState,
}

impl MediaDownloader {
    /// Create a new MediaDownloader instance
    ///
    /// This initializes all core components:
    /// - Validates the configuration and creates the download directory
    /// - Selects a resolver binary (explicit path, PATH search, or unavailable)
    /// - Builds the shared HTTP client
    /// - Sets up the event broadcast channel
    pub async fn new(config: Config) -> Result<Self> {
        // Initialize resolver based on config
        let resolver: std::sync::Arc<dyn MediaResolver> =
            if let Some(ref ytdlp_path) = config.tools.ytdlp_path {
                // Use explicitly configured binary path
                std::sync::Arc::new(CliResolver::new(ytdlp_path.clone()))
            } else if config.tools.search_path {
                // Search PATH for the yt-dlp binary
                CliResolver::from_path()
                    .map(|r| std::sync::Arc::new(r) as std::sync::Arc<dyn MediaResolver>)
                    .unwrap_or_else(|| std::sync::Arc::new(UnavailableResolver))
            } else {
                // No binary configured and PATH search disabled
                std::sync::Arc::new(UnavailableResolver)
            };

        let caps = resolver.capabilities();
        tracing::info!(
            resolver = resolver.name(),
            video = caps.video,
            audio = caps.audio,
            "Resolver initialized"
        );

        Self::with_resolver(config, resolver).await
    }

    /// Create a MediaDownloader with a caller-provided resolver
    ///
    /// Skips binary discovery; hosts and tests can plug in their own
    /// [`MediaResolver`] implementation.
    pub async fn with_resolver(
        config: Config,
        resolver: std::sync::Arc<dyn MediaResolver>,
    ) -> Result<Self> {
        config.validate()?;

        // Ensure the default download directory exists
        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        let http_client = reqwest::Client::builder()
            .timeout(config.http.request_timeout)
            .connect_timeout(config.http.connect_timeout)
            .build()?;

        // Create broadcast channel with buffer size of 1000 events
        // This allows multiple subscribers to receive all events independently
        let (event_tx, _rx) = tokio::sync::broadcast::channel(1000);

        let tasks = TaskState {
            registry: std::sync::Arc::new(tokio::sync::Mutex::new(
                std::collections::HashMap::new(),
            )),
            active: std::sync::Arc::new(tokio::sync::Mutex::new(std::collections::HashMap::new())),
            concurrent_limit: std::sync::Arc::new(tokio::sync::Semaphore::new(
                config.download.max_concurrent_downloads,
            )),
            accepting_new: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true)),
            next_id: std::sync::Arc::new(std::sync::atomic::AtomicI64::new(1)),
        };

        Ok(Self {
            event_tx,
            config: std::sync::Arc::new(config),
            http_client,
            resolver,
            tasks,
        })
    }

    /// Subscribe to download events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// Events are buffered, but if a subscriber falls behind by more than 1000 events,
    /// it will receive a `RecvError::Lagged` error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use media_dl::{Config, MediaDownloader};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let downloader = MediaDownloader::new(Config::default()).await?;
    ///
    ///     // UI subscriber
    ///     let mut ui_events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = ui_events.recv().await {
    ///             println!("UI: {:?}", event);
    ///         }
    ///     });
    ///
    ///     // Logging subscriber
    ///     let mut log_events = downloader.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = log_events.recv().await {
    ///             tracing::info!(?event, "download event");
    ///         }
    ///     });
    ///
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    ///
    /// The configuration is wrapped in an Arc, so this is a cheap clone operation.
    pub fn get_config(&self) -> std::sync::Arc<Config> {
        std::sync::Arc::clone(&self.config)
    }

    /// Query what the active resolver supports
    ///
    /// Image downloads are always available; video and audio depend on the
    /// resolver binary being found or configured.
    pub fn capabilities(&self) -> ResolverCapabilities {
        self.resolver.capabilities()
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers, the event is silently dropped (ok() converts Err to None).
    /// This allows the download process to continue even if no one is listening to events.
    pub(crate) fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }
}
