//! Media resolution via an external resolver binary
//!
//! Video and audio downloads are delegated to an external URL-to-media
//! resolver (yt-dlp). The [`MediaResolver`] trait keeps the downloader
//! decoupled from the concrete binary so hosts and tests can plug in their
//! own implementations.

mod cli;
pub(crate) mod progress;

pub use cli::CliResolver;

use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use crate::config::Quality;
use crate::types::{MediaKind, ProgressUpdate};

/// Channel through which a resolver reports progress to the bridge
pub type ProgressSink = tokio::sync::mpsc::UnboundedSender<ProgressUpdate>;

/// A single resolution job handed to a resolver
#[derive(Clone, Debug)]
pub struct ResolveJob {
    /// Source URL
    pub url: String,
    /// Media kind (Video or Audio; Image never reaches a resolver)
    pub kind: MediaKind,
    /// Effective quality (request override or configured default)
    pub quality: Quality,
    /// Directory the result is saved to
    pub output_dir: PathBuf,
}

/// How a resolution ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The download finished; the final path is reported when known
    Completed(Option<PathBuf>),
    /// The cancellation token fired and the operation was stopped
    Cancelled,
}

/// What a resolver implementation can do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolverCapabilities {
    /// Whether video downloads are supported
    pub video: bool,
    /// Whether audio extraction is supported
    pub audio: bool,
}

/// Trait for URL-to-media resolution implementations
///
/// Implementations must be cancellation-aware: when the token fires they stop
/// best-effort (killing a child process, abandoning a read) and return
/// [`ResolveOutcome::Cancelled`] rather than an error.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Resolve a URL into a media file on disk, reporting progress through the sink
    async fn resolve(
        &self,
        job: ResolveJob,
        progress: ProgressSink,
        cancel: CancellationToken,
    ) -> crate::Result<ResolveOutcome>;

    /// Query what this resolver supports
    fn capabilities(&self) -> ResolverCapabilities;

    /// Implementation name for logging
    fn name(&self) -> &'static str;
}

/// Resolver used when no binary is configured or found in PATH
///
/// Every resolve attempt fails with [`Error::NotSupported`](crate::Error::NotSupported).
/// Image downloads are unaffected; they never go through a resolver.
pub struct UnavailableResolver;

#[async_trait]
impl MediaResolver for UnavailableResolver {
    async fn resolve(
        &self,
        job: ResolveJob,
        _progress: ProgressSink,
        _cancel: CancellationToken,
    ) -> crate::Result<ResolveOutcome> {
        Err(crate::Error::NotSupported(format!(
            "no resolver binary available for {} download (install yt-dlp or set ytdlp_path)",
            job.kind
        )))
    }

    fn capabilities(&self) -> ResolverCapabilities {
        ResolverCapabilities {
            video: false,
            audio: false,
        }
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unavailable_resolver_reports_no_capabilities() {
        let resolver = UnavailableResolver;
        let caps = resolver.capabilities();
        assert!(!caps.video);
        assert!(!caps.audio);
        assert_eq!(resolver.name(), "unavailable");
    }

    #[tokio::test]
    async fn unavailable_resolver_fails_with_not_supported() {
        let resolver = UnavailableResolver;
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let job = ResolveJob {
            url: "https://example.com/watch?v=abc".into(),
            kind: MediaKind::Video,
            quality: Quality::Best,
            output_dir: "/tmp".into(),
        };

        let err = resolver
            .resolve(job, tx, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::NotSupported(_)));
        assert!(err.to_string().contains("yt-dlp"));
    }
}
