use std::{sync::Arc, time::Duration};

use tempfile::TempPath;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    common::{
        errors::{PlayerError, UserError},
        types::{ChannelId, GuildId, MessageId, UserId},
    },
    configs::KaraokeConfig,
    player::context::PlayPurpose,
    protocol::{events::RoomEvent, tracks::TrackRef},
    server::Scheduler,
    sources::{TrackResolver, manager::is_link},
    voice::ensure_connected,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KaraokePhase {
    Recording,
    Scoring,
    Scored,
    Failed,
}

/// One participant singing over a backing track while the room's voice is recorded.
pub struct KaraokeSession {
    pub id: Uuid,
    pub title: String,
    pub singer: UserId,
    pub backing: TrackRef,
    pub reference: TrackRef,
    /// Text channel the result is delivered to.
    pub channel: ChannelId,
    /// Announcement the result replies to, when posting it succeeded.
    pub message: Option<MessageId>,
    pub phase: KaraokePhase,
    /// Set once finalization has begun; never cleared.
    pub completed: bool,
    reference_audio: Option<JoinHandle<Option<TempPath>>>,
}

impl KaraokeSession {
    pub fn is_recording(&self) -> bool {
        self.phase == KaraokePhase::Recording && !self.completed
    }

    /// Drop the session without scoring. A pending reference download is aborted;
    /// a finished one is deleted with its `TempPath`.
    pub(crate) fn abandon(mut self) {
        if let Some(download) = self.reference_audio.take() {
            download.abort();
        }
    }
}

/// What `start_karaoke` set in motion.
#[derive(Debug, Clone, PartialEq)]
pub struct KaraokeStart {
    pub id: Uuid,
    pub backing: TrackRef,
    pub reference: TrackRef,
}

/// Search queries for the backing track and the reference recording.
///
/// Links are used verbatim for both. Free text gets the backing suffix appended
/// (unless already present) when `backing` is set, otherwise the query is played
/// as-is and the original suffix is used to find the reference.
pub fn karaoke_queries(query: &str, backing: bool, config: &KaraokeConfig) -> (String, String) {
    let query = query.trim();
    if is_link(query) {
        return (query.to_string(), query.to_string());
    }

    if backing {
        let suffix = config.backing_suffix.trim();
        let has_suffix = query.to_lowercase().contains(&suffix.to_lowercase());
        let backing_query = if has_suffix || suffix.is_empty() {
            query.to_string()
        } else {
            format!("{} {}", query, suffix)
        };
        (backing_query, query.to_string())
    } else {
        let suffix = config.original_suffix.trim();
        let reference_query = if suffix.is_empty() {
            query.to_string()
        } else {
            format!("{} {}", query, suffix)
        };
        (query.to_string(), reference_query)
    }
}

async fn download_reference(resolver: Arc<TrackResolver>, track: TrackRef) -> Option<TempPath> {
    let path = match tempfile::Builder::new()
        .prefix("karaoke-ref-")
        .suffix(".m4a")
        .tempfile()
    {
        Ok(file) => file.into_temp_path(),
        Err(e) => {
            warn!("Could not create reference file: {}", e);
            return None;
        }
    };

    match resolver.download(&track, &path).await {
        Ok(()) => Some(path),
        Err(e) => {
            debug!("Reference download for '{}' failed: {}", track.title, e);
            None
        }
    }
}

impl Scheduler {
    /// Start a karaoke session for `singer`: the backing track replaces current
    /// playback and the room's voice is recorded until the track ends or the
    /// singer stops it.
    pub async fn start_karaoke(
        &self,
        guild: &GuildId,
        singer: UserId,
        voice_channel: Option<ChannelId>,
        text_channel: ChannelId,
        query: &str,
        backing: bool,
    ) -> Result<KaraokeStart, PlayerError> {
        let channel = voice_channel.ok_or(UserError::NotInVoice)?;
        let room = self.inner.registry.get_or_create(guild);
        if room.lock().await.karaoke.is_some() {
            return Err(UserError::KaraokeActive.into());
        }

        let (backing_query, reference_query) =
            karaoke_queries(query, backing, &self.inner.config.karaoke);
        let (backing_track, reference_track) = futures::try_join!(
            self.inner.resolver.lookup(&backing_query),
            self.inner.resolver.lookup(&reference_query)
        )?;

        let mut session = room.lock().await;
        if session.karaoke.is_some() {
            return Err(UserError::KaraokeActive.into());
        }

        ensure_connected(
            self.inner.driver.as_ref(),
            guild,
            channel,
            &self.inner.config.voice,
        )
        .await?;
        session.voice_channel = Some(channel);

        // Recording comes first: if it is refused, the current playback is untouched.
        self.inner.driver.start_recording(guild).await?;

        // Karaoke takes over the transport; whatever was playing is set aside.
        let interrupted = session.now_playing.clone();
        if interrupted.is_some() {
            if let Some(task) = session.clear_playback() {
                task.cancel().await;
            }
            self.inner.driver.stop(guild);
        }

        let id = Uuid::new_v4();
        let download = tokio::spawn(download_reference(
            self.inner.resolver.clone(),
            reference_track.clone(),
        ));

        session.karaoke = Some(KaraokeSession {
            id,
            title: backing_track.title.clone(),
            singer,
            backing: backing_track.clone(),
            reference: reference_track.clone(),
            channel: text_channel,
            message: None,
            phase: KaraokePhase::Recording,
            completed: false,
            reference_audio: Some(download),
        });

        if let Err(e) = self
            .start_track(&mut session, backing_track.clone(), PlayPurpose::Karaoke(id))
            .await
        {
            warn!("[{}] Karaoke backing track failed: {}", guild, e);
            if let Some(karaoke) = session.karaoke.take() {
                karaoke.abandon();
            }
            self.inner.driver.stop_recording(guild).await;

            // give the room back the music karaoke interrupted
            if let Some(track) = interrupted {
                session.queue.push_front(track);
            }
            if !session.queue.is_empty() {
                self.advance_locked(&mut session).await;
            }
            return Err(e);
        }

        // Announced only once the backing track is playing.
        let announcement = RoomEvent::KaraokeStarted {
            backing: backing_track.clone(),
            reference: reference_track.clone(),
        };
        let message = match self.inner.notifier.post(text_channel, &announcement).await {
            Ok(message) => message,
            Err(e) => {
                warn!("[{}] Could not announce karaoke: {}", guild, e);
                None
            }
        };
        if let Some(karaoke) = session.karaoke.as_mut() {
            karaoke.message = message;
        }

        info!(
            "[{}] Karaoke {} started by {} on '{}'",
            guild, id, singer, backing_track.title
        );
        Ok(KaraokeStart {
            id,
            backing: backing_track,
            reference: reference_track,
        })
    }

    /// Stop the backing track early and score what was sung so far.
    pub async fn stop_karaoke_and_grade(
        &self,
        guild: &GuildId,
        user: UserId,
    ) -> Result<(), PlayerError> {
        let room = self
            .inner
            .registry
            .get(guild)
            .ok_or(UserError::NoKaraoke)?;

        let id = {
            let session = room.lock().await;
            let karaoke = session.karaoke.as_ref().ok_or(UserError::NoKaraoke)?;
            if karaoke.singer != user {
                return Err(UserError::NotKaraokeOwner.into());
            }
            karaoke.id
        };

        self.finalize_karaoke(guild, id).await;
        Ok(())
    }

    /// Score karaoke session `id` and deliver the result exactly once, no matter
    /// how many times this is called.
    pub(crate) async fn finalize_karaoke(&self, guild: &GuildId, id: Uuid) {
        let Some(room) = self.inner.registry.get(guild) else {
            return;
        };

        // -- 1. Latch the session and stop capturing -----------------------------
        let (singer, title, uri, channel, message, download) = {
            let mut session = room.lock().await;
            let Some(karaoke) = session.karaoke.as_mut().filter(|k| k.id == id) else {
                return;
            };
            if karaoke.completed {
                return;
            }
            karaoke.completed = true;
            karaoke.phase = KaraokePhase::Scoring;

            let latched = (
                karaoke.singer,
                karaoke.title.clone(),
                karaoke.reference.uri.clone(),
                karaoke.channel,
                karaoke.message,
                karaoke.reference_audio.take(),
            );

            if session.purpose == PlayPurpose::Karaoke(id) {
                if let Some(task) = session.clear_playback() {
                    task.cancel().await;
                }
                self.inner.driver.stop(guild);
            }
            self.inner.driver.stop_recording(guild).await;
            latched
        };

        // -- 2. Give the receiver time to flush, then collect the artifact -------
        tokio::time::sleep(Duration::from_millis(self.inner.config.karaoke.flush_wait_ms)).await;

        let artifact = match self.inner.driver.take_recording(guild, singer).await {
            Some(wav) => save_artifact(&wav).await,
            None => Err("recording failed".to_string()),
        };
        let reference = match download {
            Some(download) => download.await.ok().flatten(),
            None => None,
        };

        // -- 3. Score ------------------------------------------------------------
        let (event, artifact) = match artifact {
            Ok(path) => {
                let score = self.inner.scorer.score(&path, reference.as_deref()).await;
                info!(
                    "[{}] Karaoke {} scored {} ({})",
                    guild, id, score.total_score, score.grade
                );
                let event = RoomEvent::KaraokeResult {
                    title: title.clone(),
                    uri,
                    singer,
                    score,
                };
                (event, Some(path))
            }
            Err(reason) => {
                warn!("[{}] Karaoke {} failed: {}", guild, id, reason);
                (RoomEvent::KaraokeFailed { title, reason }, None)
            }
        };

        // -- 4. Deliver, unless the session was torn down meanwhile --------------
        let still_ours = room
            .lock()
            .await
            .karaoke
            .as_ref()
            .is_some_and(|k| k.id == id);
        if still_ours {
            self.deliver(channel, message, &event).await;
        } else {
            debug!("[{}] Karaoke {} was cancelled; result dropped", guild, id);
        }

        // -- 5. Clean up and resume the queue ------------------------------------
        for path in artifact.into_iter().chain(reference) {
            if let Err(e) = path.close() {
                warn!("[{}] Could not delete karaoke artifact: {}", guild, e);
            }
        }

        let mut session = room.lock().await;
        if let Some(mut karaoke) = session.karaoke.take_if(|k| k.id == id) {
            karaoke.phase = if matches!(event, RoomEvent::KaraokeResult { .. }) {
                KaraokePhase::Scored
            } else {
                KaraokePhase::Failed
            };
            debug!("[{}] Karaoke {} closed ({:?})", guild, id, karaoke.phase);
        }

        if session.karaoke.is_none() && session.now_playing.is_none() && !session.queue.is_empty()
        {
            self.advance_locked(&mut session).await;
        }
    }

    async fn deliver(&self, channel: ChannelId, message: Option<MessageId>, event: &RoomEvent) {
        if let Some(message) = message {
            match self.inner.notifier.reply(channel, message, event).await {
                Ok(()) => return,
                Err(e) => warn!("Reply to karaoke announcement failed, posting instead: {}", e),
            }
        }
        if let Err(e) = self.inner.notifier.post(channel, event).await {
            error!("Could not deliver karaoke result: {}", e);
        }
    }
}

async fn save_artifact(wav: &[u8]) -> Result<TempPath, String> {
    let path = tempfile::Builder::new()
        .prefix("karaoke-")
        .suffix(".wav")
        .tempfile()
        .map_err(|e| format!("could not save the recording: {}", e))?
        .into_temp_path();
    tokio::fs::write(&path, wav)
        .await
        .map_err(|e| format!("could not save the recording: {}", e))?;
    Ok(path)
}
