use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use super::{CaptionProvider, TimedLine, lrc::parse_lrc};
use crate::protocol::tracks::TrackRef;

pub struct LrcLibProvider {
    client: reqwest::Client,
}

impl LrcLibProvider {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Strip the decorations video titles carry but lyric databases do not.
    pub fn clean(text: &str, remove_feat: bool) -> String {
        let mut result = text.to_string();

        let patterns = [
            r#"(?i)\s*\([^)]*(?:official|lyrics?|video|audio|mv|visualizer|color\s*coded|hd|4k|prod\.)[^)]*\)"#,
            r#"(?i)\s*\[[^\]]*(?:official|lyrics?|video|audio|mv|visualizer|color\s*coded|hd|4k|prod\.)[^\]]*\]"#,
            r#"(?i)\s*-\s*Topic$"#,
            r#"(?i)VEVO$"#,
        ];

        for pattern in patterns {
            if let Ok(re) = Regex::new(pattern) {
                result = re.replace_all(&result, "").to_string();
            }
        }

        if remove_feat {
            if let Ok(re) = Regex::new(r#"(?i)\s*[(\[]\s*(?:ft\.?|feat\.?|featuring)\s+[^)\]]+[)\]]"#)
            {
                result = re.replace_all(&result, "").to_string();
            }
        }

        result.trim().to_string()
    }

    /// Prefer an exact title match, then any non-instrumental result that has synced lyrics.
    fn pick<'a>(results: &'a [Value], title: &str) -> Option<&'a Value> {
        let title_lower = title.to_lowercase();
        let usable = |r: &&Value| {
            !r["instrumental"].as_bool().unwrap_or(false) && r["syncedLyrics"].as_str().is_some()
        };

        results
            .iter()
            .filter(usable)
            .find(|r| {
                Self::clean(r["trackName"].as_str().unwrap_or(""), true).to_lowercase()
                    == title_lower
            })
            .or_else(|| results.iter().find(usable))
    }
}

#[async_trait]
impl CaptionProvider for LrcLibProvider {
    fn name(&self) -> &'static str {
        "lrclib"
    }

    async fn fetch(&self, track: &TrackRef) -> Option<Vec<TimedLine>> {
        let title = Self::clean(&track.title, true);
        let author = track
            .author
            .as_deref()
            .map(|a| Self::clean(a, false))
            .unwrap_or_default();

        let query = format!("{} {}", title, author);
        let url = format!(
            "https://lrclib.net/api/search?q={}",
            urlencoding::encode(query.trim())
        );

        let resp = self.client.get(url).send().await.ok()?;
        if !resp.status().is_success() {
            tracing::debug!("lrclib returned {} for '{}'", resp.status(), title);
            return None;
        }

        let results: Value = resp.json().await.ok()?;
        let best = Self::pick(results.as_array()?, &title)?;
        let lines = parse_lrc(best["syncedLyrics"].as_str()?);

        (!lines.is_empty()).then_some(lines)
    }
}
