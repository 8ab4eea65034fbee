use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

/// Everything a media backend knows about one resolved item.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaInfo {
    pub title: String,
    pub uri: String,
    /// Length in milliseconds, `None` for live streams.
    pub length: Option<u64>,
    pub artwork_url: Option<String>,
    pub author: Option<String>,
    pub view_count: Option<u64>,
    /// Stable key that resolves to this same item again.
    pub key: String,
    /// Direct, expiring stream URL when the backend selected a format.
    pub stream_url: Option<String>,
    pub headers: Vec<(String, String)>,
}

/// Failures as classified by the backing media service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("no results")]
    NotFound,
    #[error("private video")]
    Private,
    #[error("video unavailable")]
    Unavailable,
    #[error("members-only content")]
    MembersOnly,
    #[error("blocked or region restricted")]
    RegionBlocked,
    #[error("{0}")]
    Other(String),
}

pub type BoxedBackend = Box<dyn MediaBackend>;

/// A service that turns queries and links into playable media.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Resolve a free-text query or a link to the first matching item.
    async fn resolve(&self, query: &str) -> Result<MediaInfo, BackendError>;

    /// Download the audio of `key` to `dest`, in a format the local decoder reads.
    async fn download(&self, key: &str, dest: &Path) -> Result<(), BackendError>;
}
