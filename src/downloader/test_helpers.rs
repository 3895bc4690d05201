//! Shared test helpers for creating MediaDownloader instances in tests.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::downloader::MediaDownloader;
use crate::resolver::{
    MediaResolver, ProgressSink, ResolveJob, ResolveOutcome, ResolverCapabilities,
};
use crate::types::{DownloadId, Event, ProgressUpdate};

/// Scripted behavior for [`FakeResolver`]
#[derive(Clone, Debug)]
pub(crate) enum FakeScript {
    /// Emit the given percentages, then complete with the given path
    Succeed {
        percents: Vec<f32>,
        path: Option<PathBuf>,
    },
    /// Emit the given percentages, then fail with the given message
    Fail { percents: Vec<f32>, message: String },
    /// Park until the cancellation token fires, then report Cancelled
    BlockUntilCancelled,
    /// Park until the cancellation token fires, then return an error
    /// (models a resolver whose wind-down path errors instead of reporting
    /// Cancelled, e.g. a killed child process)
    FailWhenCancelled { message: String },
}

/// In-process resolver that follows a script instead of spawning a binary
pub(crate) struct FakeResolver {
    script: FakeScript,
}

impl FakeResolver {
    pub(crate) fn new(script: FakeScript) -> Self {
        Self { script }
    }
}

#[async_trait]
impl MediaResolver for FakeResolver {
    async fn resolve(
        &self,
        _job: ResolveJob,
        progress: ProgressSink,
        cancel: CancellationToken,
    ) -> crate::Result<ResolveOutcome> {
        match &self.script {
            FakeScript::Succeed { percents, path } => {
                for percent in percents {
                    if cancel.is_cancelled() {
                        return Ok(ResolveOutcome::Cancelled);
                    }
                    progress.send(ProgressUpdate::percent(*percent)).ok();
                    // Yield so cancellation has a chance to land mid-download
                    tokio::task::yield_now().await;
                }
                Ok(ResolveOutcome::Completed(path.clone()))
            }
            FakeScript::Fail { percents, message } => {
                for percent in percents {
                    progress.send(ProgressUpdate::percent(*percent)).ok();
                }
                Err(crate::Error::ExternalTool(message.clone()))
            }
            FakeScript::BlockUntilCancelled => {
                progress.send(ProgressUpdate::percent(0.0)).ok();
                cancel.cancelled().await;
                Ok(ResolveOutcome::Cancelled)
            }
            FakeScript::FailWhenCancelled { message } => {
                progress.send(ProgressUpdate::percent(0.0)).ok();
                cancel.cancelled().await;
                Err(crate::Error::ExternalTool(message.clone()))
            }
        }
    }

    fn capabilities(&self) -> ResolverCapabilities {
        ResolverCapabilities {
            video: true,
            audio: true,
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Helper to create a test MediaDownloader with a scripted resolver.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader(
    script: FakeScript,
) -> (MediaDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.download.max_concurrent_downloads = 3;

    let downloader = MediaDownloader::with_resolver(config, Arc::new(FakeResolver::new(script)))
        .await
        .unwrap();

    (downloader, temp_dir)
}

/// Like [`create_test_downloader`], but with a config tweak applied first
pub(crate) async fn create_test_downloader_with(
    script: FakeScript,
    tweak: impl FnOnce(&mut Config),
) -> (MediaDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.download.max_concurrent_downloads = 3;
    tweak(&mut config);

    let downloader = MediaDownloader::with_resolver(config, Arc::new(FakeResolver::new(script)))
        .await
        .unwrap();

    (downloader, temp_dir)
}

/// Collect a task's events from a subscription until its terminal event arrives.
/// Events belonging to other tasks are dropped; panics after 5 seconds.
pub(crate) async fn events_until_terminal(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
    id: DownloadId,
) -> Vec<Event> {
    let mut events = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.unwrap();
            if event.download_id() != Some(id) {
                continue;
            }
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
    })
    .await
    .expect("timed out waiting for terminal event");
    events
}
