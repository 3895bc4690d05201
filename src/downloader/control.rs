//! Task lifecycle control: cancellation, snapshots, and shutdown

use std::sync::atomic::Ordering;
use std::time::Duration;

use super::MediaDownloader;
use crate::error::{DownloadError, Result};
use crate::types::{DownloadId, DownloadInfo, Event, TaskHandle};

/// How long shutdown waits for cancelled workers to finish
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

impl MediaDownloader {
    /// Request cancellation of a task
    ///
    /// Cancellation is cooperative: the worker observes the token at its next
    /// check point (between chunks for images, at the next output line for
    /// resolver downloads) and winds down, emitting [`Event::Cancelled`] as
    /// the task's terminal event. A task that has already reached a terminal
    /// state is left untouched; cancelling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::NotFound`] if the handle does not belong to
    /// this downloader instance.
    pub async fn cancel(&self, handle: &TaskHandle) -> Result<()> {
        let id = handle.id();

        {
            let registry = self.tasks.registry.lock().await;
            let info = registry
                .get(&id)
                .ok_or(DownloadError::NotFound { id: id.0 })?;
            // Idempotent on finished tasks: no second terminal event
            if info.status.is_terminal() {
                tracing::debug!(download_id = id.0, status = ?info.status, "Cancel ignored, task already finished");
                return Ok(());
            }
        }

        if let Some(token) = self.tasks.active.lock().await.get(&id) {
            tracing::info!(download_id = id.0, "Cancellation requested");
            token.cancel();
        }

        Ok(())
    }

    /// Request cancellation of every non-terminal task
    pub async fn cancel_all(&self) {
        let active = self.tasks.active.lock().await;
        tracing::info!(count = active.len(), "Cancelling all active downloads");
        for token in active.values() {
            token.cancel();
        }
    }

    /// Snapshot of a single task
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::NotFound`] for an unknown ID.
    pub async fn info(&self, id: DownloadId) -> Result<DownloadInfo> {
        let registry = self.tasks.registry.lock().await;
        registry
            .get(&id)
            .cloned()
            .ok_or_else(|| DownloadError::NotFound { id: id.0 }.into())
    }

    /// Snapshot of all known tasks, ordered by submission
    pub async fn list(&self) -> Vec<DownloadInfo> {
        let registry = self.tasks.registry.lock().await;
        let mut infos: Vec<DownloadInfo> = registry.values().cloned().collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    /// Snapshot of tasks that have not reached a terminal state
    pub async fn active(&self) -> Vec<DownloadInfo> {
        let registry = self.tasks.registry.lock().await;
        let mut infos: Vec<DownloadInfo> = registry
            .values()
            .filter(|info| !info.status.is_terminal())
            .cloned()
            .collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    /// Gracefully shut down the downloader
    ///
    /// Stops accepting new submissions, cancels every active task, waits for
    /// the workers to emit their terminal events, and finally broadcasts
    /// [`Event::Shutdown`]. Workers that don't wind down within the drain
    /// timeout are abandoned (their processes were already killed by their
    /// cancellation tokens).
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutdown initiated");
        self.tasks.accepting_new.store(false, Ordering::SeqCst);

        self.cancel_all().await;

        let drained = tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, async {
            loop {
                if self.tasks.active.lock().await.is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await;

        if drained.is_err() {
            tracing::warn!("Shutdown drain timed out with workers still active");
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("Shutdown complete");
        Ok(())
    }
}
