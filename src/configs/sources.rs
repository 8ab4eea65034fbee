use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SourcesConfig {
    /// Path or name of the yt-dlp executable.
    pub ytdlp_path: String,
    /// Prefix used for free-text queries, e.g. `ytsearch` or `scsearch`.
    pub search_prefix: String,
    /// Format selector for playback streams.
    pub stream_format: String,
    /// Format selector for downloaded reference recordings. Must be decodable locally.
    pub download_format: String,
    pub timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
            search_prefix: "ytsearch".to_string(),
            stream_format: "bestaudio/best".to_string(),
            download_format: "bestaudio[ext=m4a]/bestaudio[acodec=mp3]/bestaudio".to_string(),
            timeout_secs: 30,
        }
    }
}
