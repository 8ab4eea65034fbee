use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::{
    common::types::{GuildId, Shared},
    player::context::RoomSession,
};

/// Process-wide map of room sessions. Each session sits behind its own lock, so
/// rooms never wait on each other.
#[derive(Default)]
pub struct SessionRegistry {
    rooms: DashMap<GuildId, Shared<RoomSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, guild: &GuildId) -> Shared<RoomSession> {
        self.rooms
            .entry(guild.clone())
            .or_insert_with(|| {
                tracing::debug!("[{}] Creating room session", guild);
                Arc::new(Mutex::new(RoomSession::new(guild.clone())))
            })
            .clone()
    }

    pub fn get(&self, guild: &GuildId) -> Option<Shared<RoomSession>> {
        self.rooms.get(guild).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, guild: &GuildId) -> Option<Shared<RoomSession>> {
        self.rooms.remove(guild).map(|(_, room)| room)
    }

    /// Rooms registered right now. The map is not locked while callers use the result.
    pub fn guilds(&self) -> Vec<GuildId> {
        self.rooms.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_returns_same_session() {
        let registry = SessionRegistry::new();
        let guild = GuildId::from(10u64);

        let a = registry.get_or_create(&guild);
        a.lock().await.queue.push_back(crate::test_support::track("One"));
        let b = registry.get_or_create(&guild);

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.lock().await.queue.len(), 1);
        assert_eq!(registry.guilds(), vec![guild.clone()]);

        assert!(registry.remove(&guild).is_some());
        assert!(registry.get(&guild).is_none());
        assert!(registry.is_empty());
    }
}
