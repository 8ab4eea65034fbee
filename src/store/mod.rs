use async_trait::async_trait;

use crate::{
    common::{errors::StoreError, types::GuildId},
    protocol::tracks::TrackRef,
};

pub mod json;
pub mod memory;

pub use json::JsonStore;
pub use memory::MemoryStore;

/// Per-room settings and named saved queues.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Stored volume (0-100) of the room, `None` when never set.
    async fn volume(&self, guild: &GuildId) -> Result<Option<u8>, StoreError>;

    async fn set_volume(&self, guild: &GuildId, volume: u8) -> Result<(), StoreError>;

    /// Save `tracks` under `name`, replacing an existing queue with that name.
    async fn save_playlist(
        &self,
        guild: &GuildId,
        name: &str,
        tracks: &[TrackRef],
    ) -> Result<(), StoreError>;

    async fn load_playlist(
        &self,
        guild: &GuildId,
        name: &str,
    ) -> Result<Option<Vec<TrackRef>>, StoreError>;

    /// Saved queue names of the room with their track counts, sorted by name.
    async fn list_playlists(&self, guild: &GuildId) -> Result<Vec<(String, usize)>, StoreError>;
}
