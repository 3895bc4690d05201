//! Direct HTTP fetching for image downloads
//!
//! Images don't go through the external resolver; they are streamed straight
//! to disk with the shared [`reqwest::Client`]. Progress is reported per
//! chunk, as a percentage when the server sends Content-Length and as byte
//! counts otherwise.

use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::config::FileCollisionAction;
use crate::error::Result;
use crate::resolver::{ProgressSink, ResolveOutcome};
use crate::types::ProgressUpdate;
use crate::utils;

/// Byte interval between progress messages when the total size is unknown
const UNKNOWN_SIZE_REPORT_STEP: u64 = 256 * 1024;

/// Download an image over HTTP, streaming the body to `output_dir`
///
/// The destination filename comes from the response's Content-Disposition
/// header or the URL path, resolved against existing files per the collision
/// strategy. A partial file is removed on failure or cancellation.
pub async fn fetch_image(
    client: &reqwest::Client,
    url: &str,
    output_dir: &Path,
    collision: FileCollisionAction,
    progress: &ProgressSink,
    cancel: &CancellationToken,
) -> Result<ResolveOutcome> {
    let response = client.get(url).send().await?.error_for_status()?;

    let filename = utils::filename_from_response(&response, url);
    let dest = utils::unique_path(&output_dir.join(filename), collision)?;
    let total_bytes = response.content_length();

    tracing::debug!(url, dest = %dest.display(), ?total_bytes, "Fetching image");
    progress
        .send(ProgressUpdate::message(format!(
            "Saving to {}",
            dest.display()
        )))
        .ok();

    let mut file = tokio::fs::File::create(&dest).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;
    let mut last_reported: u64 = 0;

    while let Some(chunk) = stream.next().await {
        // Cooperative cancellation, checked between chunks
        if cancel.is_cancelled() {
            discard_partial(file, &dest).await;
            return Ok(ResolveOutcome::Cancelled);
        }

        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                discard_partial(file, &dest).await;
                return Err(e.into());
            }
        };

        if let Err(e) = file.write_all(&chunk).await {
            discard_partial(file, &dest).await;
            return Err(e.into());
        }
        written += chunk.len() as u64;

        match total_bytes {
            Some(total) if total > 0 => {
                let percent = (written as f32 / total as f32 * 100.0).min(100.0);
                progress
                    .send(ProgressUpdate {
                        percent: Some(percent),
                        message: format!("{written} / {total} bytes"),
                    })
                    .ok();
            }
            _ => {
                if written - last_reported >= UNKNOWN_SIZE_REPORT_STEP {
                    last_reported = written;
                    progress
                        .send(ProgressUpdate::message(format!("{written} bytes received")))
                        .ok();
                }
            }
        }
    }

    file.flush().await?;
    tracing::info!(url, dest = %dest.display(), written, "Image download complete");

    Ok(ResolveOutcome::Completed(Some(dest)))
}

/// Drop the handle and remove a partially written file, best-effort
async fn discard_partial(file: tokio::fs::File, path: &PathBuf) {
    drop(file);
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial file");
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sink() -> (
        ProgressSink,
        tokio::sync::mpsc::UnboundedReceiver<ProgressUpdate>,
    ) {
        tokio::sync::mpsc::unbounded_channel()
    }

    #[tokio::test]
    async fn downloads_image_to_disk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/cat.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"pngdata".to_vec()))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let (tx, mut rx) = sink();
        let client = reqwest::Client::new();

        let outcome = fetch_image(
            &client,
            &format!("{}/images/cat.png", server.uri()),
            dir.path(),
            FileCollisionAction::Rename,
            &tx,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let expected = dir.path().join("cat.png");
        assert_eq!(outcome, ResolveOutcome::Completed(Some(expected.clone())));
        assert_eq!(std::fs::read(&expected).unwrap(), b"pngdata");

        // At least one percentage update (Content-Length is known)
        drop(tx);
        let mut saw_percent = false;
        while let Some(update) = rx.recv().await {
            if update.percent == Some(100.0) {
                saw_percent = true;
            }
        }
        assert!(saw_percent, "expected a 100% progress update");
    }

    #[tokio::test]
    async fn filename_comes_from_content_disposition() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dl"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-disposition", "attachment; filename=\"sunset.jpg\"")
                    .set_body_bytes(b"jpegdata".to_vec()),
            )
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let (tx, _rx) = sink();
        let client = reqwest::Client::new();

        let outcome = fetch_image(
            &client,
            &format!("{}/dl", server.uri()),
            dir.path(),
            FileCollisionAction::Rename,
            &tx,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            ResolveOutcome::Completed(Some(dir.path().join("sunset.jpg")))
        );
    }

    #[tokio::test]
    async fn filename_decodes_rfc5987_content_disposition() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dl"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(
                        "content-disposition",
                        "attachment; filename*=UTF-8''na%C3%AFve.jpg",
                    )
                    .set_body_bytes(b"jpegdata".to_vec()),
            )
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let (tx, _rx) = sink();
        let client = reqwest::Client::new();

        let outcome = fetch_image(
            &client,
            &format!("{}/dl", server.uri()),
            dir.path(),
            FileCollisionAction::Rename,
            &tx,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            ResolveOutcome::Completed(Some(dir.path().join("naïve.jpg")))
        );
    }

    #[tokio::test]
    async fn http_error_status_fails_the_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let (tx, _rx) = sink();
        let client = reqwest::Client::new();

        let err = fetch_image(
            &client,
            &format!("{}/missing.png", server.uri()),
            dir.path(),
            FileCollisionAction::Rename,
            &tx,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, crate::Error::Network(_)));
        // Nothing written
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn cancellation_removes_partial_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64 * 1024]))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let (tx, _rx) = sink();
        let client = reqwest::Client::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = fetch_image(
            &client,
            &format!("{}/big.png", server.uri()),
            dir.path(),
            FileCollisionAction::Rename,
            &tx,
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(outcome, ResolveOutcome::Cancelled);
        assert!(!dir.path().join("big.png").exists());
    }

    #[tokio::test]
    async fn collision_rename_keeps_existing_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cat.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("cat.png"), b"old").unwrap();

        let (tx, _rx) = sink();
        let client = reqwest::Client::new();

        let outcome = fetch_image(
            &client,
            &format!("{}/cat.png", server.uri()),
            dir.path(),
            FileCollisionAction::Rename,
            &tx,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            ResolveOutcome::Completed(Some(dir.path().join("cat (1).png")))
        );
        assert_eq!(std::fs::read(dir.path().join("cat.png")).unwrap(), b"old");
    }
}
