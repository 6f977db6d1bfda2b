//! Production [`MediaFetcher`] backed by the yt-dlp executable.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

use crate::config::ToolConfig;
use crate::fetcher::{
    progress::progress_from_line, MediaFetcher, PlaylistEntry, PlaylistListing, ProgressSender,
    VideoMetadata,
};
use crate::utils::truncate_error;
use crate::{Error, Result};

/// Format selector: prefer mp4 containers so predicted paths usually match
const FORMAT_SELECTOR: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// yt-dlp backed fetcher
#[derive(Debug)]
pub struct YtDlpFetcher {
    binary: PathBuf,
    metadata_timeout: Duration,
    listing_timeout: Duration,
    fetch_timeout: Duration,
}

impl YtDlpFetcher {
    /// Build a fetcher from tool configuration
    ///
    /// Uses the explicit `ytdlp_path` when set, otherwise searches PATH.
    pub fn from_config(tool: &ToolConfig) -> Result<Self> {
        let binary = match &tool.ytdlp_path {
            Some(path) => path.clone(),
            None if tool.search_path => which::which("yt-dlp")
                .map_err(|_| Error::ToolNotFound("yt-dlp".to_string()))?,
            None => return Err(Error::ToolNotFound("yt-dlp".to_string())),
        };

        tracing::debug!(binary = %binary.display(), "Using download tool");

        Ok(Self {
            binary,
            metadata_timeout: tool.metadata_timeout,
            listing_timeout: tool.listing_timeout,
            fetch_timeout: tool.fetch_timeout,
        })
    }

    /// Run the tool to completion, capturing output, under a time bound
    async fn run_capturing(
        &self,
        args: &[&str],
        bound: Duration,
        operation: &str,
    ) -> Result<std::process::Output> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(bound, cmd.output()).await {
            Ok(result) => result.map_err(|e| self.spawn_error(e))?,
            Err(_) => {
                return Err(Error::ToolTimeout {
                    operation: operation.to_string(),
                    timeout_secs: bound.as_secs(),
                })
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ExternalTool(truncate_error(&format!(
                "yt-dlp exited with {} during {}: {}",
                output.status,
                operation,
                stderr.trim()
            ))));
        }

        Ok(output)
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::ToolNotFound(self.binary.display().to_string())
        } else {
            Error::Io(e)
        }
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn probe(&self, url: &str) -> Result<VideoMetadata> {
        let output = self
            .run_capturing(
                &["--dump-json", "--no-playlist", url],
                self.metadata_timeout,
                "metadata probe",
            )
            .await?;

        let value: serde_json::Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            Error::ExternalTool(format!("unparseable metadata output: {e}"))
        })?;

        Ok(parse_video_metadata(&value))
    }

    async fn list_playlist(&self, url: &str, max_entries: usize) -> Result<PlaylistListing> {
        let range = format!("1:{max_entries}");
        let output = self
            .run_capturing(
                &[
                    "--flat-playlist",
                    "--dump-single-json",
                    "--playlist-items",
                    &range,
                    url,
                ],
                self.listing_timeout,
                "playlist listing",
            )
            .await?;

        let value: serde_json::Value = serde_json::from_slice(&output.stdout).map_err(|e| {
            Error::ExternalTool(format!("unparseable playlist output: {e}"))
        })?;

        Ok(parse_playlist_listing(&value, max_entries))
    }

    async fn fetch(
        &self,
        url: &str,
        output_template: &str,
        progress: ProgressSender,
    ) -> Result<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.args([
            "-f",
            FORMAT_SELECTOR,
            "--merge-output-format",
            "mp4",
            "-o",
            output_template,
            "--no-playlist",
            "--newline",
            "--progress",
            url,
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        let stdout = child.stdout.take();

        let run = async move {
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(percent) = progress_from_line(&line) {
                        // Receiver gone means the job was dropped; keep draining
                        let _ = progress.send(percent);
                    }
                }
            }

            let output = child.wait_with_output().await.map_err(Error::Io)?;
            if output.status.success() {
                Ok(())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(Error::ExternalTool(truncate_error(&format!(
                    "yt-dlp exited with {}: {}",
                    output.status,
                    stderr.trim()
                ))))
            }
        };

        // kill_on_drop reaps the child when the timeout wins the race
        match timeout(self.fetch_timeout, run).await {
            Ok(result) => result,
            Err(_) => Err(Error::ToolTimeout {
                operation: "content fetch".to_string(),
                timeout_secs: self.fetch_timeout.as_secs(),
            }),
        }
    }
}

/// Map a `--dump-json` object onto [`VideoMetadata`]
fn parse_video_metadata(value: &serde_json::Value) -> VideoMetadata {
    VideoMetadata {
        title: value
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string(),
        description: value
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        duration_secs: value
            .get("duration")
            .and_then(|v| v.as_f64())
            .map(|d| d as i64),
        uploader: value
            .get("uploader")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        upload_date: value
            .get("upload_date")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        view_count: value.get("view_count").and_then(|v| v.as_i64()),
        like_count: value.get("like_count").and_then(|v| v.as_i64()),
        format_count: value
            .get("formats")
            .and_then(|v| v.as_array())
            .map(Vec::len)
            .unwrap_or(0),
    }
}

/// Map a `--flat-playlist --dump-single-json` object onto [`PlaylistListing`]
fn parse_playlist_listing(value: &serde_json::Value, max_entries: usize) -> PlaylistListing {
    let entries = value
        .get("entries")
        .and_then(|v| v.as_array())
        .map(|entries| {
            entries
                .iter()
                .take(max_entries)
                .filter_map(|entry| {
                    let url = entry_url(entry)?;
                    Some(PlaylistEntry {
                        url,
                        title: entry
                            .get("title")
                            .and_then(|v| v.as_str())
                            .map(str::to_string),
                    })
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    PlaylistListing {
        title: value
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown playlist")
            .to_string(),
        description: value
            .get("description")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        uploader: value
            .get("uploader")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        total_count: value
            .get("playlist_count")
            .and_then(|v| v.as_u64())
            .map(|c| c as usize)
            .unwrap_or(entries.len()),
        entries,
    }
}

/// Resolve a flat-listing entry to a fetchable URL
///
/// Flat listings carry either a full URL or a bare video id depending on the
/// extractor.
fn entry_url(entry: &serde_json::Value) -> Option<String> {
    if let Some(url) = entry.get("url").and_then(|v| v.as_str()) {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Some(url.to_string());
        }
    }
    if let Some(url) = entry.get("webpage_url").and_then(|v| v.as_str()) {
        return Some(url.to_string());
    }
    entry
        .get("id")
        .and_then(|v| v.as_str())
        .map(|id| format!("https://www.youtube.com/watch?v={id}"))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_config_with_explicit_path_skips_discovery() {
        let tool = ToolConfig {
            ytdlp_path: Some(PathBuf::from("/opt/tools/yt-dlp")),
            ..ToolConfig::default()
        };

        let fetcher = YtDlpFetcher::from_config(&tool).unwrap();
        assert_eq!(fetcher.binary, PathBuf::from("/opt/tools/yt-dlp"));
        assert_eq!(fetcher.fetch_timeout, Duration::from_secs(300));
    }

    #[test]
    fn from_config_without_path_or_search_fails() {
        let tool = ToolConfig {
            ytdlp_path: None,
            search_path: false,
            ..ToolConfig::default()
        };

        match YtDlpFetcher::from_config(&tool).unwrap_err() {
            Error::ToolNotFound(name) => assert_eq!(name, "yt-dlp"),
            other => panic!("expected ToolNotFound, got {other:?}"),
        }
    }

    #[test]
    fn parse_metadata_extracts_all_fields() {
        let value = json!({
            "title": "My Video",
            "description": "about things",
            "duration": 213.0,
            "uploader": "chan",
            "upload_date": "20240115",
            "view_count": 1200,
            "like_count": 34,
            "formats": [{"format_id": "18"}, {"format_id": "22"}],
        });

        let meta = parse_video_metadata(&value);
        assert_eq!(meta.title, "My Video");
        assert_eq!(meta.description, "about things");
        assert_eq!(meta.duration_secs, Some(213));
        assert_eq!(meta.uploader.as_deref(), Some("chan"));
        assert_eq!(meta.upload_date.as_deref(), Some("20240115"));
        assert_eq!(meta.view_count, Some(1200));
        assert_eq!(meta.like_count, Some(34));
        assert_eq!(meta.format_count, 2);
    }

    #[test]
    fn parse_metadata_tolerates_missing_fields() {
        let meta = parse_video_metadata(&json!({}));
        assert_eq!(meta.title, "unknown");
        assert_eq!(meta.description, "");
        assert_eq!(meta.duration_secs, None, "missing duration stays absent");
        assert_eq!(meta.uploader, None);
        assert_eq!(meta.format_count, 0);
    }

    #[test]
    fn parse_listing_resolves_entry_urls() {
        let value = json!({
            "title": "Mix",
            "playlist_count": 3,
            "entries": [
                {"url": "https://example.com/full", "title": "full url"},
                {"id": "abc123", "url": "abc123", "title": "bare id"},
                {"webpage_url": "https://example.com/page"},
            ],
        });

        let listing = parse_playlist_listing(&value, 10);
        assert_eq!(listing.title, "Mix");
        assert_eq!(listing.total_count, 3);
        assert_eq!(listing.entries.len(), 3);
        assert_eq!(listing.entries[0].url, "https://example.com/full");
        assert_eq!(
            listing.entries[1].url,
            "https://www.youtube.com/watch?v=abc123",
            "bare video ids resolve to watch URLs"
        );
        assert_eq!(listing.entries[2].url, "https://example.com/page");
        assert_eq!(listing.entries[2].title, None);
    }

    #[test]
    fn parse_listing_caps_entries_at_requested_maximum() {
        let entries: Vec<_> = (0..8)
            .map(|i| json!({"url": format!("https://example.com/{i}")}))
            .collect();
        let value = json!({"title": "Long", "playlist_count": 8, "entries": entries});

        let listing = parse_playlist_listing(&value, 3);
        assert_eq!(listing.entries.len(), 3, "only the first N members are listed");
        assert_eq!(
            listing.total_count, 8,
            "the reported total still reflects the whole playlist"
        );
    }

    #[test]
    fn parse_listing_with_no_entries_is_empty_not_error() {
        let listing = parse_playlist_listing(&json!({"title": "Empty"}), 5);
        assert!(listing.entries.is_empty());
        assert_eq!(listing.total_count, 0);
    }

    #[test]
    fn parse_listing_skips_unresolvable_entries() {
        let value = json!({
            "title": "Mixed",
            "entries": [
                {"url": "https://example.com/ok"},
                {"duration": 10},
            ],
        });

        let listing = parse_playlist_listing(&value, 10);
        assert_eq!(listing.entries.len(), 1);
    }

    #[test]
    fn parse_listing_blank_description_becomes_none() {
        let listing =
            parse_playlist_listing(&json!({"title": "T", "description": ""}), 5);
        assert_eq!(listing.description, None);
    }
}
