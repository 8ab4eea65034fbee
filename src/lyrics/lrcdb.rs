use std::time::Duration;

use async_trait::async_trait;

use super::{CaptionProvider, TimedLine, lrc::parse_lrc};
use crate::protocol::tracks::TrackRef;

const BASE_URL: &str = "https://raw.githubusercontent.com/lrcdb/lrcdb/master/lrc";

/// Raw `.lrc` files keyed by song title.
pub struct LrcDbProvider {
    client: reqwest::Client,
    base_url: String,
}

impl LrcDbProvider {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: BASE_URL.to_string(),
        }
    }

    fn file_url(&self, title: &str) -> String {
        let key = title.trim().replace(' ', "+");
        format!("{}/{}.lrc", self.base_url, urlencoding::encode(&key).replace("%2B", "+"))
    }
}

#[async_trait]
impl CaptionProvider for LrcDbProvider {
    fn name(&self) -> &'static str {
        "lrcdb"
    }

    async fn fetch(&self, track: &TrackRef) -> Option<Vec<TimedLine>> {
        let resp = self.client.get(self.file_url(&track.title)).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }

        let body = resp.text().await.ok()?;
        let lines = parse_lrc(&body);
        (!lines.is_empty()).then_some(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_url_joins_words_with_plus() {
        let provider = LrcDbProvider::new(Duration::from_secs(1));
        assert_eq!(
            provider.file_url("Bohemian Rhapsody"),
            format!("{}/Bohemian+Rhapsody.lrc", BASE_URL)
        );
    }
}
