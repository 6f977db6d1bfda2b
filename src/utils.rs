//! Utility functions for filename prediction and text truncation

use std::path::{Path, PathBuf};

/// Characters the download tool replaces when it writes output files
const UNSAFE_TITLE_CHARS: &[char] = &['/', '\\', '|', '?', '*', '<', '>', '"', ':'];

/// Maximum length of a stored description or error message
pub const MAX_STORED_TEXT_LEN: usize = 1000;

/// Maximum description length returned by the metadata query surface
pub const MAX_REPORT_DESCRIPTION_LEN: usize = 500;

/// Sanitize a video title the way the download tool names output files
///
/// Each filesystem-unsafe character is replaced with an underscore. This
/// mirrors the tool's own substitution so the predicted path usually matches
/// the file it writes, but the prediction is best-effort and never verified
/// against the filesystem.
///
/// # Examples
///
/// ```
/// use media_dl::utils::sanitize_title;
///
/// assert_eq!(sanitize_title("AC/DC: Live"), "AC_DC_ Live");
/// assert_eq!(sanitize_title("plain title"), "plain title");
/// ```
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if UNSAFE_TITLE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Predict the output path for a video title under a download directory
///
/// The `.mp4` extension is assumed because the fetch format selector prefers
/// mp4 containers.
///
/// # Examples
///
/// ```
/// use media_dl::utils::predicted_file_path;
/// use std::path::Path;
///
/// let path = predicted_file_path(Path::new("downloads"), "My Video");
/// assert_eq!(path, Path::new("downloads/My Video.mp4"));
/// ```
#[must_use]
pub fn predicted_file_path(download_dir: &Path, title: &str) -> PathBuf {
    download_dir.join(format!("{}.mp4", sanitize_title(title)))
}

/// Truncate text to at most `max_chars` characters, respecting char boundaries
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Truncate an error message to the stored maximum
#[must_use]
pub fn truncate_error(message: &str) -> String {
    truncate_chars(message, MAX_STORED_TEXT_LEN)
}

/// Truncate a description to the stored maximum
#[must_use]
pub fn truncate_description(description: &str) -> String {
    truncate_chars(description, MAX_STORED_TEXT_LEN)
}
