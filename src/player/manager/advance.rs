use tracing::{debug, info, warn};

use crate::{
    player::{
        context::{PlayPurpose, RoomSession},
        state::LoopMode,
    },
    protocol::events::RoomEvent,
    server::Scheduler,
};

impl Scheduler {
    /// Move on from the current track according to the loop mode. Tracks that fail
    /// to start are reported and skipped until one plays or the queue runs dry.
    pub(crate) async fn advance_locked(&self, session: &mut RoomSession) {
        let guild = session.guild_id.clone();
        let finished = session.now_playing.clone();
        if let Some(task) = session.clear_playback() {
            task.cancel().await;
        }

        if self.inner.driver.current_channel(&guild).is_none() {
            info!("[{}] Voice connection is gone; clearing the session", guild);
            self.teardown_locked(session, false).await;
            return;
        }

        let mut next = match (session.loop_mode, finished) {
            (LoopMode::RepeatOne, Some(track)) => Some(track),
            // an empty queue ends the session even under RepeatAll
            (LoopMode::RepeatAll, Some(track)) => {
                let head = session.queue.pop_front();
                if head.is_some() {
                    session.queue.push_back(track);
                }
                head
            }
            _ => session.queue.pop_front(),
        };

        while let Some(track) = next {
            match self
                .start_track(session, track.clone(), PlayPurpose::Music)
                .await
            {
                Ok(()) => return,
                Err(e) => {
                    warn!("[{}] Skipping '{}': {}", guild, track.title, e);
                    self.inner.notifier.emit(
                        &guild,
                        RoomEvent::TrackException {
                            track,
                            message: e.to_string(),
                        },
                    );
                    next = session.queue.pop_front();
                }
            }
        }

        debug!("[{}] Queue finished", guild);
        self.inner.notifier.emit(&guild, RoomEvent::QueueEnded);

        if self.inner.config.player.idle_disconnect && session.karaoke.is_none() {
            self.inner.driver.disconnect(&guild).await;
            session.voice_channel = None;
        }
    }

    /// Release everything the room holds. Each step runs regardless of the others;
    /// background tasks are stopped before the transport goes away.
    pub(crate) async fn teardown_locked(&self, session: &mut RoomSession, disconnect: bool) {
        let guild = session.guild_id.clone();

        session.queue.clear();
        if let Some(task) = session.clear_playback() {
            task.cancel().await;
        }

        if let Some(karaoke) = session.karaoke.take() {
            debug!("[{}] Abandoning karaoke '{}'", guild, karaoke.title);
            karaoke.abandon();
            self.inner.driver.stop_recording(&guild).await;
        }

        self.inner.driver.stop(&guild);

        if disconnect {
            self.inner.driver.disconnect(&guild).await;
        }
        session.voice_channel = None;
    }
}
