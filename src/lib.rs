//! # media-dl
//!
//! Background media download library with a thread-safe progress bridge.
//!
//! ## Design Philosophy
//!
//! media-dl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//! - **Non-blocking** - `submit` returns immediately; downloads run on workers
//! - **Cancellable** - Every task can be cancelled cooperatively at any point
//!
//! Video and audio downloads are delegated to an external yt-dlp binary;
//! images are fetched directly over HTTP. Each task emits ordered progress
//! events followed by exactly one terminal event (`Complete`, `Failed`, or
//! `Cancelled`).
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, DownloadRequest, MediaDownloader, MediaKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = MediaDownloader::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let handle = downloader
//!         .submit(DownloadRequest::new(
//!             "https://example.com/watch?v=abc",
//!             MediaKind::Video,
//!             "./downloads",
//!         ))
//!         .await?;
//!     println!("Submitted download {}", handle.id());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Direct HTTP image fetching
pub mod fetcher;
/// URL-to-media resolution via an external binary
pub mod resolver;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, FileCollisionAction, Quality};
pub use downloader::MediaDownloader;
pub use error::{DownloadError, Error, Result};
pub use resolver::{CliResolver, MediaResolver, ResolverCapabilities, UnavailableResolver};
pub use types::{
    DownloadId, DownloadInfo, DownloadRequest, Event, MediaKind, Status, TaskHandle,
};
