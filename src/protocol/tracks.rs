use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Display-time metadata of a track. Immutable once resolved.
///
/// `resolver_key` is what the resolver needs to produce a fresh stream handle
/// right before playback; stream handles themselves are never stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRef {
    pub title: String,
    /// Canonical page link.
    pub uri: String,
    /// Length in milliseconds. `None` for live / unbounded streams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    pub resolver_key: String,
}

impl TrackRef {
    pub fn is_stream(&self) -> bool {
        self.length.is_none()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.length.map(Duration::from_millis)
    }

    /// Same logical track: same resolver key and title.
    pub fn is_same_track(&self, other: &TrackRef) -> bool {
        self.resolver_key == other.resolver_key && self.title == other.title
    }
}

impl std::fmt::Display for TrackRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.title, self.uri)
    }
}

/// A short-lived playable stream for one start of one track.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamHandle {
    /// Direct media URL handed to the voice transport.
    pub url: String,
    /// HTTP headers the media host expects (user agent, cookies, ...).
    pub headers: Vec<(String, String)>,
    /// The display metadata this handle was staged for, unchanged by staging.
    pub track: TrackRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TrackRef {
        TrackRef {
            title: "Never Gonna Give You Up".to_string(),
            uri: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            length: Some(212_000),
            artwork_url: Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg".to_string()),
            author: Some("Rick Astley".to_string()),
            view_count: Some(1_500_000_000),
            resolver_key: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
        }
    }

    #[test]
    fn test_same_track_ignores_display_extras() {
        let a = sample();
        let mut b = sample();
        b.view_count = Some(1);
        b.artwork_url = None;
        assert!(a.is_same_track(&b));

        b.title = "Never Gonna Give You Up (Live)".to_string();
        assert!(!a.is_same_track(&b));
    }

    #[test]
    fn test_missing_length_is_stream() {
        let mut track = sample();
        assert_eq!(track.duration(), Some(Duration::from_secs(212)));
        track.length = None;
        assert!(track.is_stream());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["resolverKey"], "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(json["length"], 212_000);

        let mut live = sample();
        live.length = None;
        let json = serde_json::to_value(live).unwrap();
        assert!(json.get("length").is_none());
    }
}
