use tokio::time::Instant;
use tracing::{info, warn};

use crate::{
    common::errors::PlayerError,
    player::{
        captions::CaptionTask,
        context::{PlayPurpose, RoomSession},
        state::PlaybackStatus,
    },
    protocol::{events::RoomEvent, tracks::TrackRef},
    server::Scheduler,
};

impl Scheduler {
    /// Stage `track` and hand it to the transport. On failure the room is left idle
    /// and nothing has been started.
    pub(crate) async fn start_track(
        &self,
        session: &mut RoomSession,
        track: TrackRef,
        purpose: PlayPurpose,
    ) -> Result<(), PlayerError> {
        let guild = session.guild_id.clone();

        // -- 1. Tear down whatever belonged to the previous track --------------
        if let Some(task) = session.caption_task.take() {
            task.cancel().await;
        }
        session.status = PlaybackStatus::Staging;

        // -- 2. Stage a fresh stream; resolved URLs expire ---------------------
        let handle = match self.inner.resolver.stage(&track).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("[{}] Could not stage '{}': {}", guild, track.title, e);
                if let Some(task) = session.clear_playback() {
                    task.cancel().await;
                }
                return Err(e.into());
            }
        };

        // -- 3. Start the transport at the room volume -------------------------
        let volume = self.room_volume(&guild).await;
        let end = match self
            .inner
            .driver
            .play(&guild, handle, f32::from(volume) / 100.0)
            .await
        {
            Ok(end) => end,
            Err(e) => {
                warn!("[{}] Transport refused '{}': {}", guild, track.title, e);
                if let Some(task) = session.clear_playback() {
                    task.cancel().await;
                }
                return Err(e.into());
            }
        };

        // -- 4. Commit the new playback state ----------------------------------
        let now = Instant::now();
        let token = session.issue_token();
        session.now_playing = Some(track.clone());
        session.purpose = purpose;
        session.status = PlaybackStatus::Playing;
        session.clock.start(now);

        self.spawn_end_watcher(guild.clone(), token, end);

        let captions = self.inner.captions.clone();
        let lookup = track.clone();
        session.caption_task = Some(CaptionTask::spawn(
            guild.clone(),
            track.title.clone(),
            now,
            async move { captions.fetch(&lookup).await },
            self.inner.notifier.clone(),
        ));

        info!("[{}] Now playing '{}' ({:?})", guild, track.title, purpose);
        self.inner
            .notifier
            .emit(&guild, RoomEvent::TrackStart { track });

        Ok(())
    }
}
