use std::sync::Arc;

use rand::seq::SliceRandom;
use tokio::time::Instant;
use tracing::{info, warn};

use super::{notifier::Notifier, registry::SessionRegistry};
use crate::{
    common::{
        errors::{PlayerError, UserError},
        types::{ChannelId, GuildId, Shared},
    },
    configs::Config,
    karaoke::{
        pipeline::{NativeAnalyzer, Scorer},
        speech::GoogleSpeechRecognizer,
    },
    lyrics::CaptionManager,
    player::{
        context::{PlayPurpose, RoomSession},
        state::{LoopMode, NowPlaying, PlaybackStatus},
    },
    protocol::{events::RoomEvent, tracks::TrackRef},
    sources::TrackResolver,
    store::{MemoryStore, SettingsStore},
    voice::{VoiceDriver, ensure_connected},
};

/// Outcome of a play request.
#[derive(Debug, Clone, PartialEq)]
pub enum Enqueued {
    Playing(TrackRef),
    Queued { track: TrackRef, position: usize },
}

pub(crate) struct SchedulerInner {
    pub(crate) registry: SessionRegistry,
    pub(crate) resolver: Arc<TrackResolver>,
    pub(crate) captions: Arc<CaptionManager>,
    pub(crate) driver: Arc<dyn VoiceDriver>,
    pub(crate) store: Arc<dyn SettingsStore>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) scorer: Scorer,
    pub(crate) config: Config,
}

/// Entry point for the command layer: one playback session per room, every
/// playback-affecting operation serialized on that room's lock.
#[derive(Clone)]
pub struct Scheduler {
    pub(crate) inner: Arc<SchedulerInner>,
}

pub struct SchedulerBuilder {
    config: Config,
    resolver: Option<TrackResolver>,
    captions: Option<CaptionManager>,
    store: Option<Arc<dyn SettingsStore>>,
    scorer: Option<Scorer>,
}

impl SchedulerBuilder {
    pub fn resolver(mut self, resolver: TrackResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn captions(mut self, captions: CaptionManager) -> Self {
        self.captions = Some(captions);
        self
    }

    pub fn store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn build(self, driver: Arc<dyn VoiceDriver>, notifier: Arc<dyn Notifier>) -> Scheduler {
        let config = self.config;

        let resolver = self
            .resolver
            .unwrap_or_else(|| TrackResolver::new(&config.sources));
        let captions = self
            .captions
            .unwrap_or_else(|| CaptionManager::new(&config.lyrics));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()) as Arc<dyn SettingsStore>);
        let scorer = self.scorer.unwrap_or_else(|| {
            Scorer::new(
                Arc::new(NativeAnalyzer::new(&config.karaoke)),
                Arc::new(GoogleSpeechRecognizer::new(config.speech.clone())),
                config.speech.locale.clone(),
                config.karaoke.min_overlap_secs,
            )
        });

        Scheduler {
            inner: Arc::new(SchedulerInner {
                registry: SessionRegistry::new(),
                resolver: Arc::new(resolver),
                captions: Arc::new(captions),
                driver,
                store,
                notifier,
                scorer,
                config,
            }),
        }
    }
}

impl Scheduler {
    pub fn builder(config: Config) -> SchedulerBuilder {
        SchedulerBuilder {
            config,
            resolver: None,
            captions: None,
            store: None,
            scorer: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.inner.registry
    }

    fn room(&self, guild: &GuildId) -> Result<Shared<RoomSession>, UserError> {
        self.inner
            .registry
            .get(guild)
            .ok_or(UserError::NothingPlaying)
    }

    /// Resolve `query` and play it right away when the room is idle, otherwise queue it.
    /// A failed resolution leaves the room untouched.
    pub async fn enqueue_or_play(
        &self,
        guild: &GuildId,
        voice_channel: Option<ChannelId>,
        query: &str,
    ) -> Result<Enqueued, PlayerError> {
        let channel = voice_channel.ok_or(UserError::NotInVoice)?;
        let track = self.inner.resolver.lookup(query).await?;

        let room = self.inner.registry.get_or_create(guild);
        let mut session = room.lock().await;

        if session.now_playing.is_some() || session.karaoke.is_some() || session.is_active() {
            let max = self.inner.config.player.max_queue_size;
            if max > 0 && session.queue.len() >= max {
                return Err(UserError::QueueFull(max).into());
            }
            session.queue.push_back(track.clone());
            let position = session.queue.len();
            info!("[{}] Queued '{}' at position {}", guild, track.title, position);
            return Ok(Enqueued::Queued { track, position });
        }

        ensure_connected(
            self.inner.driver.as_ref(),
            guild,
            channel,
            &self.inner.config.voice,
        )
        .await?;
        session.voice_channel = Some(channel);

        self.start_track(&mut session, track.clone(), PlayPurpose::Music)
            .await?;
        Ok(Enqueued::Playing(track))
    }

    /// Stop the current track. The transport's end signal advances the queue.
    pub async fn skip(&self, guild: &GuildId) -> Result<TrackRef, PlayerError> {
        let room = self.room(guild)?;
        let mut session = room.lock().await;

        let current = session
            .now_playing
            .clone()
            .ok_or(UserError::NothingPlaying)?;
        if matches!(session.purpose, PlayPurpose::Karaoke(_)) {
            return Err(UserError::KaraokeActive.into());
        }

        let token = session.play_token;
        if token.is_some() && session.skip_pending == token {
            return Ok(current);
        }
        session.skip_pending = token;

        if !self.inner.driver.stop(guild) {
            warn!("[{}] Skip requested but the transport had nothing playing", guild);
        }
        info!("[{}] Skipped '{}'", guild, current.title);
        Ok(current)
    }

    pub async fn pause(&self, guild: &GuildId) -> Result<TrackRef, PlayerError> {
        let room = self.room(guild)?;
        let mut session = room.lock().await;

        let track = session
            .now_playing
            .clone()
            .ok_or(UserError::NothingPlaying)?;
        match session.status {
            PlaybackStatus::Playing => {}
            PlaybackStatus::Paused => return Err(UserError::AlreadyPaused.into()),
            _ => return Err(UserError::NothingPlaying.into()),
        }

        self.inner.driver.pause(guild);
        session.clock.pause(Instant::now());
        session.status = PlaybackStatus::Paused;
        Ok(track)
    }

    pub async fn resume(&self, guild: &GuildId) -> Result<TrackRef, PlayerError> {
        let room = self.room(guild)?;
        let mut session = room.lock().await;

        let track = session
            .now_playing
            .clone()
            .ok_or(UserError::NothingPlaying)?;
        match session.status {
            PlaybackStatus::Paused => {}
            PlaybackStatus::Playing => return Err(UserError::NotPaused.into()),
            _ => return Err(UserError::NothingPlaying.into()),
        }

        self.inner.driver.resume(guild);
        session.clock.resume(Instant::now());
        session.status = PlaybackStatus::Playing;
        Ok(track)
    }

    /// Clear everything and leave the voice channel. Safe to call any number of times.
    pub async fn stop(&self, guild: &GuildId) {
        let Some(room) = self.inner.registry.get(guild) else {
            self.inner.driver.disconnect(guild).await;
            return;
        };
        let mut session = room.lock().await;
        self.teardown_locked(&mut session, true).await;
        info!("[{}] Playback stopped", guild);
    }

    pub async fn set_loop_mode(&self, guild: &GuildId, mode: LoopMode) -> LoopMode {
        let room = self.inner.registry.get_or_create(guild);
        let mut session = room.lock().await;
        session.loop_mode = mode;
        mode
    }

    pub async fn loop_mode(&self, guild: &GuildId) -> LoopMode {
        match self.inner.registry.get(guild) {
            Some(room) => room.lock().await.loop_mode,
            None => LoopMode::Off,
        }
    }

    pub async fn shuffle(&self, guild: &GuildId) -> Result<usize, PlayerError> {
        let room = self.room(guild).map_err(|_| UserError::NotEnoughToShuffle)?;
        let mut session = room.lock().await;

        let len = session.queue.len();
        if len < 2 {
            return Err(UserError::NotEnoughToShuffle.into());
        }
        session
            .queue
            .make_contiguous()
            .shuffle(&mut rand::thread_rng());
        Ok(len)
    }

    /// Remove the track at 1-based `index`.
    pub async fn remove(&self, guild: &GuildId, index: usize) -> Result<TrackRef, PlayerError> {
        let room = self.room(guild).map_err(|_| UserError::QueueEmpty)?;
        let mut session = room.lock().await;

        let len = session.queue.len();
        if len == 0 {
            return Err(UserError::QueueEmpty.into());
        }
        if index == 0 || index > len {
            return Err(UserError::InvalidIndex { index, len }.into());
        }

        session
            .queue
            .remove(index - 1)
            .ok_or_else(|| UserError::InvalidIndex { index, len }.into())
    }

    pub async fn clear_queue(&self, guild: &GuildId) -> Result<usize, PlayerError> {
        let room = self.room(guild).map_err(|_| UserError::QueueEmpty)?;
        let mut session = room.lock().await;

        let len = session.queue.len();
        if len == 0 {
            return Err(UserError::QueueEmpty.into());
        }
        session.queue.clear();
        Ok(len)
    }

    pub async fn queue(&self, guild: &GuildId) -> Vec<TrackRef> {
        match self.inner.registry.get(guild) {
            Some(room) => room.lock().await.queue.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub async fn now_playing(&self, guild: &GuildId) -> Result<NowPlaying, PlayerError> {
        let room = self.room(guild)?;
        let (track, elapsed, paused, loop_mode, queue_len, karaoke) = {
            let session = room.lock().await;
            let track = session
                .now_playing
                .clone()
                .ok_or(UserError::NothingPlaying)?;
            (
                track,
                session.elapsed(Instant::now()),
                session.status == PlaybackStatus::Paused,
                session.loop_mode,
                session.queue.len(),
                session.karaoke.is_some(),
            )
        };

        Ok(NowPlaying {
            track,
            elapsed,
            paused,
            loop_mode,
            queue_len,
            volume: self.room_volume(guild).await,
            karaoke,
        })
    }

    pub async fn volume(&self, guild: &GuildId) -> u8 {
        self.room_volume(guild).await
    }

    /// Persist the room volume and apply it to the active source.
    pub async fn set_volume(&self, guild: &GuildId, volume: i64) -> Result<u8, PlayerError> {
        let volume = u8::try_from(volume)
            .ok()
            .filter(|v| *v <= 100)
            .ok_or(UserError::InvalidVolume(volume))?;

        self.inner.store.set_volume(guild, volume).await?;
        self.inner.driver.set_volume(guild, f32::from(volume) / 100.0);
        Ok(volume)
    }

    pub(crate) async fn room_volume(&self, guild: &GuildId) -> u8 {
        let default = self.inner.config.player.default_volume.min(100);
        match self.inner.store.volume(guild).await {
            Ok(Some(volume)) => volume.min(100),
            Ok(None) => default,
            Err(e) => {
                warn!("[{}] Could not read stored volume: {}", guild, e);
                default
            }
        }
    }

    /// Connect (or move) to the caller's voice channel without playing anything.
    pub async fn join(
        &self,
        guild: &GuildId,
        voice_channel: Option<ChannelId>,
    ) -> Result<ChannelId, PlayerError> {
        let channel = voice_channel.ok_or(UserError::NotInVoice)?;
        if self.inner.driver.current_channel(guild) == Some(channel) {
            return Err(UserError::AlreadyConnected.into());
        }

        let room = self.inner.registry.get_or_create(guild);
        let mut session = room.lock().await;
        ensure_connected(
            self.inner.driver.as_ref(),
            guild,
            channel,
            &self.inner.config.voice,
        )
        .await?;
        session.voice_channel = Some(channel);
        Ok(channel)
    }

    pub async fn save_queue(&self, guild: &GuildId, name: &str) -> Result<usize, PlayerError> {
        let tracks = self.queue(guild).await;
        if tracks.is_empty() {
            return Err(UserError::QueueEmpty.into());
        }
        self.inner.store.save_playlist(guild, name, &tracks).await?;
        info!("[{}] Saved {} tracks as '{}'", guild, tracks.len(), name);
        Ok(tracks.len())
    }

    /// Replace the queue with a saved one and start it if the room is idle.
    pub async fn load_queue(
        &self,
        guild: &GuildId,
        voice_channel: Option<ChannelId>,
        name: &str,
    ) -> Result<usize, PlayerError> {
        let channel = voice_channel.ok_or(UserError::NotInVoice)?;
        let mut tracks = self
            .inner
            .store
            .load_playlist(guild, name)
            .await?
            .filter(|t| !t.is_empty())
            .ok_or_else(|| UserError::PlaylistNotFound(name.to_string()))?;

        let max = self.inner.config.player.max_queue_size;
        if max > 0 && tracks.len() > max {
            tracks.truncate(max);
        }
        let count = tracks.len();

        let room = self.inner.registry.get_or_create(guild);
        let mut session = room.lock().await;
        let idle = session.now_playing.is_none() && session.karaoke.is_none();

        // connect before touching the queue so a failure leaves the room as it was
        if idle {
            ensure_connected(
                self.inner.driver.as_ref(),
                guild,
                channel,
                &self.inner.config.voice,
            )
            .await?;
            session.voice_channel = Some(channel);
        }

        session.queue = tracks.into();
        if idle {
            self.advance_locked(&mut session).await;
        }

        Ok(count)
    }

    pub async fn list_queues(&self, guild: &GuildId) -> Result<Vec<(String, usize)>, PlayerError> {
        Ok(self.inner.store.list_playlists(guild).await?)
    }

    /// The room's voice connection is gone: drop every piece of its state.
    pub async fn handle_disconnect(&self, guild: &GuildId) {
        let Some(room) = self.inner.registry.remove(guild) else {
            return;
        };
        let mut session = room.lock().await;
        self.teardown_locked(&mut session, false).await;
        info!("[{}] Voice connection lost; session cleared", guild);
        self.inner.notifier.emit(
            guild,
            RoomEvent::Disconnected {
                guild_id: guild.clone(),
            },
        );
    }

    /// Tear down every room, e.g. before process exit.
    pub async fn shutdown(&self) {
        let guilds = self.inner.registry.guilds();
        info!("Shutting down {} room sessions", guilds.len());
        for guild in guilds {
            if let Some(room) = self.inner.registry.remove(&guild) {
                let mut session = room.lock().await;
                self.teardown_locked(&mut session, true).await;
            }
        }
    }
}
