use std::path::Path;

use super::{
    plugin::{BackendError, BoxedBackend, MediaInfo},
    ytdlp::YtDlpBackend,
};
use crate::{
    common::errors::{ResolveError, Restriction},
    configs::SourcesConfig,
    protocol::tracks::{StreamHandle, TrackRef},
};

/// Two-phase track resolution: metadata at enqueue time, a fresh stream right before playback.
pub struct TrackResolver {
    backend: BoxedBackend,
}

impl TrackResolver {
    pub fn new(config: &SourcesConfig) -> Self {
        tracing::info!("Loaded media backend: yt-dlp ({})", config.ytdlp_path);
        Self::with_backend(Box::new(YtDlpBackend::new(config.clone())))
    }

    pub fn with_backend(backend: BoxedBackend) -> Self {
        Self { backend }
    }

    /// Resolve a user query or link into display metadata.
    pub async fn lookup(&self, query: &str) -> Result<TrackRef, ResolveError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolveError::NotFound);
        }

        tracing::trace!("Looking up '{}' with backend: {}", query, self.backend.name());
        let info = self.backend.resolve(query).await.map_err(classify)?;
        Ok(track_from_info(info))
    }

    /// Obtain a non-expired stream handle for `track`. Display fields of `track` win over
    /// whatever the backend reports now.
    pub async fn stage(&self, track: &TrackRef) -> Result<StreamHandle, ResolveError> {
        let info = self
            .backend
            .resolve(&track.resolver_key)
            .await
            .map_err(classify)?;

        let url = info.stream_url.ok_or_else(|| {
            ResolveError::ResolutionFailed(format!("no playable stream for '{}'", track.title))
        })?;

        Ok(StreamHandle {
            url,
            headers: info.headers,
            track: track.clone(),
        })
    }

    /// Save the audio of `track` to `dest` for offline analysis.
    pub async fn download(&self, track: &TrackRef, dest: &Path) -> Result<(), ResolveError> {
        tracing::debug!("Downloading '{}' to {}", track.title, dest.display());
        self.backend
            .download(&track.resolver_key, dest)
            .await
            .map_err(classify)
    }
}

pub fn is_link(query: &str) -> bool {
    let query = query.trim();
    query.starts_with("http://") || query.starts_with("https://")
}

fn classify(err: BackendError) -> ResolveError {
    match err {
        BackendError::NotFound => ResolveError::NotFound,
        BackendError::Private => ResolveError::Restricted(Restriction::Private),
        BackendError::Unavailable => ResolveError::Restricted(Restriction::Unavailable),
        BackendError::MembersOnly => ResolveError::Restricted(Restriction::MembersOnly),
        BackendError::RegionBlocked => ResolveError::Restricted(Restriction::RegionBlocked),
        BackendError::Other(message) => ResolveError::ResolutionFailed(message),
    }
}

fn track_from_info(info: MediaInfo) -> TrackRef {
    let resolver_key = if info.key.is_empty() {
        info.uri.clone()
    } else {
        info.key
    };

    TrackRef {
        title: info.title,
        uri: info.uri,
        length: info.length,
        artwork_url: info.artwork_url,
        author: info.author,
        view_count: info.view_count,
        resolver_key,
    }
}
