//! Parsing of resolver progress output
//!
//! yt-dlp (run with `--newline`) prints one status line per update:
//!
//! ```text
//! [download]  42.3% of 10.00MiB at 1.20MiB/s ETA 00:05
//! ```

use regex::Regex;
use std::sync::LazyLock;

// Unwrap is fine: the pattern is a compile-time constant
#[allow(clippy::unwrap_used)]
static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[download\]\s+(\d+(?:\.\d+)?)%").unwrap());

/// Extract the progress percentage from a resolver output line
///
/// Returns a value in `[0.0, 100.0]`, or None for lines that are not
/// progress updates.
pub(crate) fn parse_percent(line: &str) -> Option<f32> {
    let captures = PERCENT_RE.captures(line)?;
    let percent: f32 = captures.get(1)?.as_str().parse().ok()?;
    Some(percent.clamp(0.0, 100.0))
}

/// Whether a non-progress line is worth forwarding to the host's log
///
/// Filters the noisy per-fragment chatter while keeping phase transitions
/// (destination, merging, extraction) visible.
pub(crate) fn is_log_worthy(line: &str) -> bool {
    if line.is_empty() {
        return false;
    }
    if !line.starts_with('[') {
        return false;
    }
    // Per-fragment "Sleeping"/"Downloading item" spam is dropped
    !line.contains("Sleeping") && !line.starts_with("[info] Downloading")
}
