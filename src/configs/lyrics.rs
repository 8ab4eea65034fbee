use serde::{Deserialize, Serialize};

/// Timed caption providers. All enabled providers are queried concurrently.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LyricsConfig {
    pub lrclib: bool,
    pub lrcdb: bool,
    pub request_timeout_secs: u64,
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            lrclib: true,
            lrcdb: true,
            request_timeout_secs: 10,
        }
    }
}
