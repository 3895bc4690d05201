//! Utility functions shared across the crate

use std::path::{Path, PathBuf};

use crate::config::FileCollisionAction;
use crate::error::{Error, Result};

/// Resolve a destination path according to the collision strategy
///
/// - `Rename`: append ` (1)`, ` (2)`, … before the extension until the path is free
/// - `Overwrite`: return the path unchanged
/// - `Skip`: return an error if the path already exists
pub fn unique_path(path: &Path, action: FileCollisionAction) -> Result<PathBuf> {
    match action {
        FileCollisionAction::Overwrite => Ok(path.to_path_buf()),
        FileCollisionAction::Skip => {
            if path.exists() {
                Err(Error::Other(format!(
                    "file already exists at {} (collision action: skip)",
                    path.display()
                )))
            } else {
                Ok(path.to_path_buf())
            }
        }
        FileCollisionAction::Rename => {
            if !path.exists() {
                return Ok(path.to_path_buf());
            }

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("download");
            let extension = path.extension().and_then(|e| e.to_str());
            let parent = path.parent().unwrap_or_else(|| Path::new("."));

            for n in 1u32.. {
                let candidate_name = match extension {
                    Some(ext) => format!("{stem} ({n}).{ext}"),
                    None => format!("{stem} ({n})"),
                };
                let candidate = parent.join(candidate_name);
                if !candidate.exists() {
                    return Ok(candidate);
                }
            }
            unreachable!("u32 range exhausted searching for a free filename")
        }
    }
}

/// Extract a filename from an HTTP response, falling back to the URL path
///
/// Tries, in order: the Content-Disposition header (including RFC 5987
/// encoded filenames), the last URL path segment, and finally
/// `downloaded_image.jpg`.
pub fn filename_from_response(response: &reqwest::Response, url: &str) -> String {
    // Try to extract from Content-Disposition header
    if let Some(content_disposition) = response.headers().get("content-disposition")
        && let Ok(value) = content_disposition.to_str()
    {
        // Format: attachment; filename="image.png" or filename*=UTF-8''image.png
        for part in value.split(';') {
            let part = part.trim();
            if let Some(raw) = part.strip_prefix("filename=") {
                let filename = raw.trim_matches('"');
                if !filename.is_empty() {
                    return sanitize_filename(filename);
                }
            } else if let Some(encoded) = part.strip_prefix("filename*=") {
                // RFC 5987: charset'lang'encoded-filename
                if let Some(idx) = encoded.rfind('\'')
                    && let Ok(decoded) = urlencoding::decode(&encoded[idx + 1..])
                    && !decoded.is_empty()
                {
                    return sanitize_filename(decoded.as_ref());
                }
            }
        }
    }

    // Fall back to extracting from the URL path
    if let Ok(parsed_url) = url::Url::parse(url)
        && let Some(mut segments) = parsed_url.path_segments()
        && let Some(last_segment) = segments.next_back()
        && !last_segment.is_empty()
        && last_segment.contains('.')
    {
        return sanitize_filename(last_segment);
    }

    // Last resort fallback
    "downloaded_image.jpg".to_string()
}

/// Strip path separators and control characters from a filename
pub fn sanitize_filename(name: &str) -> String {
    let replaced = name
        .replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
        .replace(['\n', '\r', '\t'], " ");
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ensure a directory exists and is writable
///
/// Creates the directory (and parents) if missing, then probes writability by
/// creating and removing a marker file. Returns a validation error naming
/// `output_dir` on any failure, so `submit` can fail fast before a worker is
/// spawned.
pub fn ensure_writable_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| {
        Error::validation(
            "output_dir",
            format!("cannot create output directory '{}': {}", dir.display(), e),
        )
    })?;

    let probe = dir.join(".media-dl-write-test");
    std::fs::write(&probe, b"").map_err(|e| {
        Error::validation(
            "output_dir",
            format!("output directory '{}' is not writable: {}", dir.display(), e),
        )
    })?;
    // Best-effort cleanup; a leftover empty probe file is harmless
    let _ = std::fs::remove_file(&probe);

    Ok(())
}
