use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::SettingsStore;
use crate::{
    common::{errors::StoreError, types::GuildId},
    protocol::tracks::TrackRef,
};

/// Process-local store. Everything is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    volumes: Mutex<HashMap<GuildId, u8>>,
    playlists: Mutex<HashMap<GuildId, BTreeMap<String, Vec<TrackRef>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn volume(&self, guild: &GuildId) -> Result<Option<u8>, StoreError> {
        Ok(self.volumes.lock().get(guild).copied())
    }

    async fn set_volume(&self, guild: &GuildId, volume: u8) -> Result<(), StoreError> {
        self.volumes.lock().insert(guild.clone(), volume);
        Ok(())
    }

    async fn save_playlist(
        &self,
        guild: &GuildId,
        name: &str,
        tracks: &[TrackRef],
    ) -> Result<(), StoreError> {
        self.playlists
            .lock()
            .entry(guild.clone())
            .or_default()
            .insert(name.to_string(), tracks.to_vec());
        Ok(())
    }

    async fn load_playlist(
        &self,
        guild: &GuildId,
        name: &str,
    ) -> Result<Option<Vec<TrackRef>>, StoreError> {
        Ok(self
            .playlists
            .lock()
            .get(guild)
            .and_then(|lists| lists.get(name).cloned()))
    }

    async fn list_playlists(&self, guild: &GuildId) -> Result<Vec<(String, usize)>, StoreError> {
        Ok(self
            .playlists
            .lock()
            .get(guild)
            .map(|lists| lists.iter().map(|(k, v)| (k.clone(), v.len())).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::track;

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let store = MemoryStore::new();
        let a = GuildId::from(1u64);
        let b = GuildId::from(2u64);

        store.set_volume(&a, 40).await.unwrap();
        store.save_playlist(&a, "night", &[track("One")]).await.unwrap();

        assert_eq!(store.volume(&a).await.unwrap(), Some(40));
        assert_eq!(store.volume(&b).await.unwrap(), None);
        assert!(store.load_playlist(&b, "night").await.unwrap().is_none());
        assert_eq!(
            store.list_playlists(&a).await.unwrap(),
            vec![("night".to_string(), 1)]
        );
    }
}
