use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PlayerConfig {
    /// Volume (0-100) used for rooms without a stored setting.
    pub default_volume: u8,
    /// Maximum queued tracks per room. `0` disables the limit.
    pub max_queue_size: usize,
    /// Leave the voice channel once the queue runs dry.
    pub idle_disconnect: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: 5,
            max_queue_size: 50,
            idle_disconnect: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct VoiceConfig {
    pub connect_attempts: u32,
    /// Base delay (ms) for the exponential backoff between connect attempts.
    pub backoff_base_ms: u64,
    /// Delay (ms) after a forced disconnect before connecting again.
    pub reconnect_settle_ms: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            connect_attempts: 3,
            backoff_base_ms: 1_000,
            reconnect_settle_ms: 800,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}
