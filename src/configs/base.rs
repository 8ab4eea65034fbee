use serde::{Deserialize, Serialize};

use crate::{common::types::AnyResult, configs::*};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub player: PlayerConfig,
    pub voice: VoiceConfig,
    pub sources: SourcesConfig,
    pub lyrics: LyricsConfig,
    pub karaoke: KaraokeConfig,
    pub speech: SpeechConfig,
    pub storage: StorageConfig,
}

impl Config {
    pub fn load() -> AnyResult<Self> {
        let config_path = if std::path::Path::new("config.toml").exists() {
            "config.toml"
        } else if std::path::Path::new("config.default.toml").exists() {
            "config.default.toml"
        } else {
            return Err("config.toml or config.default.toml not found".into());
        };

        tracing::info!("Loading configuration from: {}", config_path);

        let config_str = std::fs::read_to_string(config_path)?;
        if config_str.is_empty() {
            return Err(format!("{} is empty", config_path).into());
        }

        Self::from_toml_str(&config_str)
    }

    pub fn from_toml_str(raw: &str) -> AnyResult<Self> {
        let config: Config = toml::from_str(raw)?;
        Ok(config)
    }
}
