use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{info, warn};

use super::SettingsStore;
use crate::{
    common::{errors::StoreError, types::GuildId},
    configs::StorageConfig,
    protocol::tracks::TrackRef,
};

const SETTINGS_FILE: &str = "settings.json";
const PLAYLISTS_FILE: &str = "playlists.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RoomSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    volume: Option<u8>,
}

type Settings = HashMap<String, RoomSettings>;
type Playlists = HashMap<String, BTreeMap<String, Vec<TrackRef>>>;

/// `settings.json` and `playlists.json` under a data directory, kept in memory and
/// rewritten on every change.
pub struct JsonStore {
    dir: PathBuf,
    settings: Mutex<Settings>,
    playlists: Mutex<Playlists>,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let settings: Settings = read_or_default(&dir.join(SETTINGS_FILE)).await?;
        let playlists: Playlists = read_or_default(&dir.join(PLAYLISTS_FILE)).await?;
        info!(
            "Loaded settings for {} rooms and saved queues for {} rooms from {}",
            settings.len(),
            playlists.len(),
            dir.display()
        );

        Ok(Self {
            dir,
            settings: Mutex::new(settings),
            playlists: Mutex::new(playlists),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub async fn from_config(config: &StorageConfig) -> Result<Self, StoreError> {
        Self::open(&config.data_dir).await
    }

    async fn persist(&self, file: &str, body: String) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!("{}.tmp", file));
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

async fn read_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) if raw.trim().is_empty() => Ok(T::default()),
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("{} is malformed ({}); starting empty", path.display(), e);
                Ok(T::default())
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl SettingsStore for JsonStore {
    async fn volume(&self, guild: &GuildId) -> Result<Option<u8>, StoreError> {
        Ok(self
            .settings
            .lock()
            .get(guild.0.as_str())
            .and_then(|s| s.volume))
    }

    async fn set_volume(&self, guild: &GuildId, volume: u8) -> Result<(), StoreError> {
        let body = {
            let mut settings = self.settings.lock();
            settings.entry(guild.to_string()).or_default().volume = Some(volume);
            serde_json::to_string_pretty(&*settings)?
        };
        self.persist(SETTINGS_FILE, body).await
    }

    async fn save_playlist(
        &self,
        guild: &GuildId,
        name: &str,
        tracks: &[TrackRef],
    ) -> Result<(), StoreError> {
        let body = {
            let mut playlists = self.playlists.lock();
            playlists
                .entry(guild.to_string())
                .or_default()
                .insert(name.to_string(), tracks.to_vec());
            serde_json::to_string_pretty(&*playlists)?
        };
        self.persist(PLAYLISTS_FILE, body).await
    }

    async fn load_playlist(
        &self,
        guild: &GuildId,
        name: &str,
    ) -> Result<Option<Vec<TrackRef>>, StoreError> {
        Ok(self
            .playlists
            .lock()
            .get(guild.0.as_str())
            .and_then(|lists| lists.get(name).cloned()))
    }

    async fn list_playlists(&self, guild: &GuildId) -> Result<Vec<(String, usize)>, StoreError> {
        Ok(self
            .playlists
            .lock()
            .get(guild.0.as_str())
            .map(|lists| lists.iter().map(|(k, v)| (k.clone(), v.len())).collect())
            .unwrap_or_default())
    }
}
