//! Worker execution and the progress bridge
//!
//! Each submitted task runs in its own spawned worker. The worker forwards
//! [`ProgressUpdate`]s from the resolver or fetcher through an unbounded
//! channel into broadcast events, and waits for that forwarder to drain
//! before emitting the terminal event. This makes the terminal event the
//! last event a task ever produces, regardless of scheduling.

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::MediaDownloader;
use crate::fetcher;
use crate::resolver::{ResolveJob, ResolveOutcome};
use crate::types::{DownloadId, DownloadRequest, Event, MediaKind, ProgressUpdate, Status};

impl MediaDownloader {
    /// Spawn the worker for an admitted task
    pub(crate) fn spawn_task(&self, id: DownloadId, request: DownloadRequest, cancel: CancellationToken) {
        let downloader = self.clone();
        tokio::spawn(async move {
            downloader.run_task(id, request, cancel).await;
        });
    }

    /// Execute one task to its terminal state
    async fn run_task(self, id: DownloadId, request: DownloadRequest, cancel: CancellationToken) {
        // Wait for a worker slot; submissions beyond the limit queue here
        let permit = self
            .tasks
            .concurrent_limit
            .clone()
            .acquire_owned()
            .await;
        let _permit = match permit {
            Ok(permit) => permit,
            // Semaphore closed means the downloader is gone; nothing to do
            Err(_) => return,
        };

        // Cancelled while still queued: terminal event without ever starting
        if cancel.is_cancelled() {
            self.finish_task(id, Event::Cancelled { id }, Status::Cancelled)
                .await;
            return;
        }

        {
            let mut registry = self.tasks.registry.lock().await;
            if let Some(info) = registry.get_mut(&id) {
                info.status = Status::Running;
                info.started_at = Some(Utc::now());
            }
        }
        tracing::info!(download_id = id.0, url = %request.url, "Download started");
        self.emit_event(Event::Started { id });

        // Progress bridge: the executing side writes ProgressUpdates into the
        // channel, the forwarder turns them into broadcast events in order.
        let (progress_tx, progress_rx) = tokio::sync::mpsc::unbounded_channel();
        let forwarder = tokio::spawn(forward_progress(self.clone(), id, progress_rx));

        let quality = request.quality.unwrap_or(self.config.download.quality);
        let result = match request.kind {
            MediaKind::Image => {
                fetcher::fetch_image(
                    &self.http_client,
                    &request.url,
                    &request.output_dir,
                    self.config.download.file_collision,
                    &progress_tx,
                    &cancel,
                )
                .await
            }
            MediaKind::Video | MediaKind::Audio => {
                let job = ResolveJob {
                    url: request.url.clone(),
                    kind: request.kind,
                    quality,
                    output_dir: request.output_dir.clone(),
                };
                self.resolver
                    .resolve(job, progress_tx.clone(), cancel.clone())
                    .await
            }
        };

        // Close the channel and let the forwarder drain every queued update
        // before the terminal event goes out.
        drop(progress_tx);
        forwarder.await.ok();

        match result {
            Ok(ResolveOutcome::Completed(path)) => {
                tracing::info!(download_id = id.0, path = ?path, "Download complete");
                {
                    let mut registry = self.tasks.registry.lock().await;
                    if let Some(info) = registry.get_mut(&id) {
                        info.progress = 100.0;
                    }
                }
                self.finish_task(id, Event::Complete { id, path }, Status::Complete)
                    .await;
            }
            Ok(ResolveOutcome::Cancelled) => {
                tracing::info!(download_id = id.0, "Download cancelled");
                self.finish_task(id, Event::Cancelled { id }, Status::Cancelled)
                    .await;
            }
            Err(e) => {
                // A cancellation request outranks whatever error the wind-down
                // produced (killed child, aborted read): the host asked for
                // Cancelled and that is the terminal event it gets.
                if cancel.is_cancelled() {
                    tracing::info!(download_id = id.0, error = %e, "Download cancelled during wind-down");
                    self.finish_task(id, Event::Cancelled { id }, Status::Cancelled)
                        .await;
                } else {
                    tracing::error!(download_id = id.0, error = %e, "Download failed");
                    self.finish_task(
                        id,
                        Event::Failed {
                            id,
                            error: e.to_string(),
                        },
                        Status::Failed,
                    )
                    .await;
                }
            }
        }
    }

    /// Record the terminal status, emit the terminal event, and deregister the task
    ///
    /// The active-map entry is removed only after the terminal event has been
    /// broadcast, so shutdown's drain wait cannot emit `Shutdown` ahead of a
    /// task's terminal event.
    async fn finish_task(&self, id: DownloadId, event: Event, status: Status) {
        {
            let mut registry = self.tasks.registry.lock().await;
            if let Some(info) = registry.get_mut(&id) {
                info.status = status;
                info.finished_at = Some(Utc::now());
            }
        }
        self.emit_event(event);
        self.tasks.active.lock().await.remove(&id);
    }
}

/// Translate ProgressUpdates into broadcast events, preserving order
///
/// Percentage updates also refresh the registry snapshot so `info()` polling
/// tracks the event stream.
async fn forward_progress(
    downloader: MediaDownloader,
    id: DownloadId,
    mut rx: tokio::sync::mpsc::UnboundedReceiver<ProgressUpdate>,
) {
    while let Some(update) = rx.recv().await {
        match update.percent {
            Some(percent) => {
                {
                    let mut registry = downloader.tasks.registry.lock().await;
                    if let Some(info) = registry.get_mut(&id) {
                        info.progress = percent;
                    }
                }
                downloader.emit_event(Event::Progress {
                    id,
                    percent: Some(percent),
                    message: update.message,
                });
            }
            None => {
                downloader.emit_event(Event::Log {
                    id,
                    message: update.message,
                });
            }
        }
    }
}
