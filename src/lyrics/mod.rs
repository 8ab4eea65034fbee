use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};

use crate::{configs::LyricsConfig, protocol::tracks::TrackRef};

pub mod lrc;
pub mod lrcdb;
pub mod lrclib;

use self::{lrcdb::LrcDbProvider, lrclib::LrcLibProvider};

/// One caption line and its offset from the start of the track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedLine {
    pub offset: Duration,
    pub text: String,
}

#[async_trait]
pub trait CaptionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Synced captions for `track`, sorted by offset. `None` when the provider has none.
    async fn fetch(&self, track: &TrackRef) -> Option<Vec<TimedLine>>;
}

pub struct CaptionManager {
    pub providers: Vec<Arc<dyn CaptionProvider>>,
}

impl CaptionManager {
    pub fn new(config: &LyricsConfig) -> Self {
        let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
        let mut providers: Vec<Arc<dyn CaptionProvider>> = Vec::new();

        macro_rules! register_provider {
            ($enabled:expr, $name:literal, $ctor:expr) => {
                if $enabled {
                    providers.push(Arc::new($ctor));
                    tracing::info!("Loaded caption provider: {}", $name);
                }
            };
        }

        register_provider!(config.lrclib, "LRCLib", LrcLibProvider::new(timeout));
        register_provider!(config.lrcdb, "lrcdb", LrcDbProvider::new(timeout));

        Self { providers }
    }

    pub fn with_providers(providers: Vec<Arc<dyn CaptionProvider>>) -> Self {
        Self { providers }
    }

    /// Ask every provider at once and keep the first non-empty answer.
    pub async fn fetch(&self, track: &TrackRef) -> Option<Vec<TimedLine>> {
        let mut futures = FuturesUnordered::new();

        for provider in &self.providers {
            let provider = provider.clone();
            let track = track.clone();
            futures.push(async move {
                let lines = provider.fetch(&track).await;
                (provider.name(), lines)
            });
        }

        while let Some((name, result)) = futures.next().await {
            if let Some(mut lines) = result.filter(|l| !l.is_empty()) {
                lines.sort_by_key(|l| l.offset);
                tracing::debug!("Captions for '{}' found via {}", track.title, name);
                return Some(lines);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeCaptions, track};

    #[tokio::test]
    async fn test_first_non_empty_provider_wins() {
        let empty: Arc<dyn CaptionProvider> = Arc::new(FakeCaptions::new(Some(vec![])));
        let none: Arc<dyn CaptionProvider> = Arc::new(FakeCaptions::new(None));
        let found: Arc<dyn CaptionProvider> = Arc::new(FakeCaptions::lines(&[
            (4_000, "second"),
            (1_000, "first"),
        ]));

        let manager = CaptionManager::with_providers(vec![empty, none, found]);
        let lines = manager.fetch(&track("Marigold")).await.unwrap();
        assert_eq!(lines[0].text, "first");
        assert_eq!(lines[1].offset, Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_no_providers_means_no_captions() {
        let manager = CaptionManager::with_providers(Vec::new());
        assert!(manager.fetch(&track("Marigold")).await.is_none());
    }
}
