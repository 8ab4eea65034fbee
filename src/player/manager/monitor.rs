use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{Instrument, debug, warn};

use crate::{
    common::types::GuildId,
    player::context::PlayPurpose,
    protocol::events::RoomEvent,
    server::Scheduler,
    voice::TrackEnd,
};

impl Scheduler {
    /// Wait for the transport to report the end of the start identified by `token`.
    /// Holds only a weak reference so a dropped scheduler does not linger.
    pub(crate) fn spawn_end_watcher(
        &self,
        guild: GuildId,
        token: u64,
        end: oneshot::Receiver<TrackEnd>,
    ) {
        let inner = Arc::downgrade(&self.inner);
        let span = tracing::debug_span!("track_end", guild = %guild, token);

        tokio::spawn(
            async move {
                let reason = end.await.unwrap_or(TrackEnd::Stopped);
                let Some(inner) = inner.upgrade() else {
                    return;
                };
                Scheduler { inner }.on_track_end(&guild, token, reason).await;
            }
            .instrument(span),
        );
    }

    pub(crate) async fn on_track_end(&self, guild: &GuildId, token: u64, reason: TrackEnd) {
        let Some(room) = self.inner.registry.get(guild) else {
            return;
        };
        let mut session = room.lock().await;

        if !session.is_current(token) {
            debug!("[{}] Ignoring stale end signal ({:?})", guild, reason);
            return;
        }

        if let TrackEnd::Errored(message) = &reason {
            warn!("[{}] Track failed mid-playback: {}", guild, message);
            if let Some(track) = session.now_playing.clone() {
                self.inner.notifier.emit(
                    guild,
                    RoomEvent::TrackException {
                        track,
                        message: message.clone(),
                    },
                );
            }
        }

        match session.purpose {
            PlayPurpose::Karaoke(id) => {
                if let Some(task) = session.clear_playback() {
                    task.cancel().await;
                }
                drop(session);
                self.finalize_karaoke(guild, id).await;
            }
            PlayPurpose::Music => self.advance_locked(&mut session).await,
        }
    }
}

