use std::{path::Path, process::Stdio, time::Duration};

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use super::{
    manager::is_link,
    plugin::{BackendError, MediaBackend, MediaInfo},
};
use crate::configs::SourcesConfig;

/// Media backend driving the `yt-dlp` executable.
pub struct YtDlpBackend {
    config: SourcesConfig,
}

impl YtDlpBackend {
    pub fn new(config: SourcesConfig) -> Self {
        Self { config }
    }

    fn target(&self, query: &str) -> String {
        if is_link(query) {
            query.trim().to_string()
        } else {
            format!("{}1:{}", self.config.search_prefix, query.trim())
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, BackendError> {
        let mut command = Command::new(&self.config.ytdlp_path);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let timeout = Duration::from_secs(self.config.timeout_secs.max(1));
        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(BackendError::Other(format!(
                    "failed to run {}: {}",
                    self.config.ytdlp_path, e
                )));
            }
            Err(_) => {
                return Err(BackendError::Other(format!(
                    "yt-dlp timed out after {}s",
                    timeout.as_secs()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!("yt-dlp exited with {}: {}", output.status, stderr.trim());
            return Err(classify_stderr(&stderr));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl MediaBackend for YtDlpBackend {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn resolve(&self, query: &str) -> Result<MediaInfo, BackendError> {
        let target = self.target(query);
        let stdout = self
            .run(&[
                "-J",
                "--no-playlist",
                "--no-warnings",
                "-f",
                &self.config.stream_format,
                &target,
            ])
            .await?;

        let json: Value = serde_json::from_slice(&stdout)
            .map_err(|e| BackendError::Other(format!("unreadable yt-dlp output: {}", e)))?;
        parse_info(&json).ok_or(BackendError::NotFound)
    }

    async fn download(&self, key: &str, dest: &Path) -> Result<(), BackendError> {
        let dest_str = dest.to_string_lossy();
        self.run(&[
            "--no-playlist",
            "--no-warnings",
            "--quiet",
            "--force-overwrites",
            "-f",
            &self.config.download_format,
            "-o",
            &dest_str,
            &self.target(key),
        ])
        .await?;

        match tokio::fs::metadata(dest).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(BackendError::Other(format!(
                "yt-dlp produced no file at {}",
                dest.display()
            ))),
        }
    }
}

/// Map yt-dlp's error text onto the classified failures.
pub fn classify_stderr(stderr: &str) -> BackendError {
    if stderr.contains("Private video") {
        BackendError::Private
    } else if stderr.contains("Video unavailable") || stderr.contains("This video is not available")
    {
        BackendError::Unavailable
    } else if stderr.contains("members-only content") {
        BackendError::MembersOnly
    } else if stderr.to_lowercase().contains("blocked") {
        BackendError::RegionBlocked
    } else {
        let message = stderr
            .lines()
            .rev()
            .find(|l| l.contains("ERROR"))
            .or_else(|| stderr.lines().rev().find(|l| !l.trim().is_empty()))
            .map(|l| l.trim().trim_start_matches("ERROR:").trim().to_string())
            .unwrap_or_else(|| "yt-dlp failed".to_string());
        BackendError::Other(message)
    }
}

/// Extract the first usable entry from a `yt-dlp -J` document.
pub fn parse_info(json: &Value) -> Option<MediaInfo> {
    let entry = match json.get("entries") {
        Some(Value::Array(entries)) => entries.iter().find(|e| !e.is_null())?,
        Some(_) => return None,
        None => json,
    };

    let title = entry["title"].as_str()?.to_string();
    let uri = entry["webpage_url"]
        .as_str()
        .or_else(|| entry["original_url"].as_str())
        .or_else(|| entry["url"].as_str())?
        .to_string();

    let is_live = entry["is_live"].as_bool().unwrap_or(false);
    let length = entry["duration"]
        .as_f64()
        .filter(|d| *d > 0.0 && !is_live)
        .map(|d| (d * 1000.0).round() as u64);

    let headers = entry["http_headers"]
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Some(MediaInfo {
        title,
        key: uri.clone(),
        uri,
        length,
        artwork_url: entry["thumbnail"].as_str().map(str::to_string),
        author: entry["uploader"]
            .as_str()
            .or_else(|| entry["channel"].as_str())
            .map(str::to_string),
        view_count: entry["view_count"].as_u64(),
        stream_url: entry["url"].as_str().map(str::to_string),
        headers,
    })
}
