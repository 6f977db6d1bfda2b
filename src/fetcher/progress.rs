//! Parsing of the download tool's line-oriented progress output.

use regex::Regex;
use std::sync::OnceLock;

/// Matches lines like `[download]  45.2% of 100.00MiB at 2.50MiB/s`
fn download_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::unwrap_used)] // pattern is a compile-time constant
        Regex::new(r"^\[download\]\s+(\d+(?:\.\d+)?)%").unwrap()
    })
}

/// Extract a progress percentage from one line of tool output
///
/// Returns `Some(100)` for the "already downloaded" marker the tool prints
/// when the output file exists, `Some(floor(pct))` for `[download] NN.N%`
/// lines, and `None` for everything else (merge messages, warnings, blank
/// lines).
#[must_use]
pub fn progress_from_line(line: &str) -> Option<u8> {
    if line.contains("has already been downloaded") {
        return Some(100);
    }

    let caps = download_line_re().captures(line.trim_start())?;
    let pct: f64 = caps.get(1)?.as_str().parse().ok()?;
    Some(pct.floor().min(100.0) as u8)
}
