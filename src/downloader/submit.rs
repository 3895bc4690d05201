//! Request validation and task admission

use chrono::Utc;
use std::sync::atomic::Ordering;
use tokio_util::sync::CancellationToken;

use super::MediaDownloader;
use crate::error::{Error, Result};
use crate::types::{DownloadId, DownloadInfo, DownloadRequest, Event, Status, TaskHandle};
use crate::utils;

impl MediaDownloader {
    /// Submit a download request
    ///
    /// Validation failures (bad URL, unwritable output directory, duplicate of
    /// an active task) are returned synchronously; nothing is registered and
    /// no events are emitted for a rejected request. On success the task is
    /// registered as `Queued`, an [`Event::Queued`] is broadcast, a worker is
    /// spawned, and the returned [`TaskHandle`] identifies the task in all
    /// subsequent events.
    ///
    /// # Errors
    ///
    /// - [`Error::ShuttingDown`] after [`shutdown`](Self::shutdown) has begun
    /// - [`Error::Validation`] for an empty, unparseable, or non-HTTP URL, or
    ///   an output directory that cannot be created or written
    /// - [`Error::Duplicate`] when `reject_duplicate_active` is set and an
    ///   identical request (same URL, kind, and output directory) is still
    ///   running
    pub async fn submit(&self, request: DownloadRequest) -> Result<TaskHandle> {
        if !self.tasks.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        validate_url(&request.url)?;
        utils::ensure_writable_dir(&request.output_dir)?;

        // Registration happens under the registry lock so a concurrent
        // identical submit cannot slip past the duplicate check.
        let id = {
            let mut registry = self.tasks.registry.lock().await;

            if self.config.download.reject_duplicate_active {
                let duplicate = registry.values().any(|info| {
                    !info.status.is_terminal()
                        && info.url == request.url
                        && info.kind == request.kind
                        && info.output_dir == request.output_dir
                });
                if duplicate {
                    return Err(Error::Duplicate(request.url.clone()));
                }
            }

            let id = DownloadId::new(self.tasks.next_id.fetch_add(1, Ordering::SeqCst));
            registry.insert(
                id,
                DownloadInfo {
                    id,
                    url: request.url.clone(),
                    kind: request.kind,
                    status: Status::Queued,
                    progress: 0.0,
                    output_dir: request.output_dir.clone(),
                    created_at: Utc::now(),
                    started_at: None,
                    finished_at: None,
                },
            );
            id
        };

        let cancel = CancellationToken::new();
        self.tasks.active.lock().await.insert(id, cancel.clone());

        tracing::info!(download_id = id.0, url = %request.url, kind = %request.kind, "Download submitted");
        self.emit_event(Event::Queued {
            id,
            url: request.url.clone(),
        });

        self.spawn_task(id, request, cancel);

        Ok(TaskHandle { id })
    }
}

/// Validate a request URL before any task state is created
fn validate_url(url: &str) -> Result<()> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("url", "URL must not be empty"));
    }

    let parsed = url::Url::parse(trimmed)
        .map_err(|e| Error::validation("url", format!("invalid URL '{trimmed}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::validation(
            "url",
            format!("unsupported URL scheme '{other}' (expected http or https)"),
        )),
    }
}
