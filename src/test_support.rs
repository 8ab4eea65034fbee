//! In-process fakes of the collaborators the scheduler drives.

use std::{
    collections::{HashMap, HashSet},
    io::{Cursor, Seek, Write},
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::{
    common::{
        errors::{Analysis, AnalysisError, TransportError},
        types::{AnyResult, ChannelId, GuildId, MessageId, UserId},
    },
    configs::Config,
    karaoke::{
        pipeline::{NativeAnalyzer, Scorer},
        speech::SpeechRecognizer,
    },
    lyrics::{CaptionManager, CaptionProvider, TimedLine},
    protocol::{
        events::RoomEvent,
        tracks::{StreamHandle, TrackRef},
    },
    server::{Scheduler, notifier::Notifier},
    sources::{BackendError, MediaBackend, MediaInfo, TrackResolver},
    store::MemoryStore,
    voice::{TrackEnd, VoiceDriver},
};

pub fn track(title: &str) -> TrackRef {
    let slug = title.to_lowercase().replace(' ', "-");
    TrackRef {
        title: title.to_string(),
        uri: format!("https://youtu.be/{}", slug),
        length: Some(180_000),
        artwork_url: None,
        author: None,
        view_count: None,
        resolver_key: format!("https://youtu.be/{}", slug),
    }
}

pub fn media(title: &str, uri: &str) -> MediaInfo {
    MediaInfo {
        title: title.to_string(),
        uri: uri.to_string(),
        length: Some(180_000),
        key: uri.to_string(),
        stream_url: Some(format!("{}/stream", uri)),
        ..Default::default()
    }
}

pub fn timed(lines: &[(u64, &str)]) -> Vec<TimedLine> {
    lines
        .iter()
        .map(|(ms, text)| TimedLine {
            offset: Duration::from_millis(*ms),
            text: text.to_string(),
        })
        .collect()
}

fn pcm16(rate: u32, channels: u16) -> WavSpec {
    WavSpec {
        channels,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

fn write_samples<W: Write + Seek>(writer: &mut WavWriter<W>, samples: &[f32], channels: u16) {
    for sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(value).unwrap();
        }
    }
}

/// 16-bit PCM WAV with every mono sample copied to each channel.
pub fn wav_bytes(samples: &[f32], rate: u32, channels: u16) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    let mut writer = WavWriter::new(&mut cursor, pcm16(rate, channels)).unwrap();
    write_samples(&mut writer, samples, channels);
    writer.finalize().unwrap();
    cursor.into_inner()
}

pub fn write_wav(path: &Path, samples: &[f32], rate: u32, channels: u16) {
    let mut writer = WavWriter::create(path, pcm16(rate, channels)).unwrap();
    write_samples(&mut writer, samples, channels);
    writer.finalize().unwrap();
}

// -- Media backend ---------------------------------------------------------

#[derive(Clone, Default)]
pub struct FakeBackend {
    entries: Arc<Mutex<HashMap<String, Result<MediaInfo, BackendError>>>>,
}

impl FakeBackend {
    /// Register `info` under `query`, and under its key unless that is already taken.
    pub fn insert(&self, query: &str, info: MediaInfo) {
        let mut entries = self.entries.lock();
        entries
            .entry(info.key.clone())
            .or_insert_with(|| Ok(info.clone()));
        entries.insert(query.to_string(), Ok(info));
    }

    pub fn fail(&self, query: &str, err: BackendError) {
        self.entries.lock().insert(query.to_string(), Err(err));
    }
}

#[async_trait]
impl MediaBackend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    async fn resolve(&self, query: &str) -> Result<MediaInfo, BackendError> {
        self.entries
            .lock()
            .get(query)
            .cloned()
            .unwrap_or(Err(BackendError::NotFound))
    }

    async fn download(&self, _key: &str, _dest: &Path) -> Result<(), BackendError> {
        Err(BackendError::Other("downloads are not supported here".into()))
    }
}

// -- Captions --------------------------------------------------------------

pub struct FakeCaptions(Option<Vec<TimedLine>>);

impl FakeCaptions {
    pub fn new(lines: Option<Vec<TimedLine>>) -> Self {
        Self(lines)
    }

    pub fn lines(lines: &[(u64, &str)]) -> Self {
        Self(Some(timed(lines)))
    }
}

#[async_trait]
impl CaptionProvider for FakeCaptions {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn fetch(&self, _track: &TrackRef) -> Option<Vec<TimedLine>> {
        self.0.clone()
    }
}

// -- Speech ----------------------------------------------------------------

pub struct FakeSpeech(Option<String>);

impl FakeSpeech {
    pub fn failing() -> Self {
        Self(None)
    }

    pub fn text(text: &str) -> Self {
        Self(Some(text.to_string()))
    }
}

#[async_trait]
impl SpeechRecognizer for FakeSpeech {
    async fn transcribe(&self, _audio: &Path, _locale: &str) -> Analysis<String> {
        self.0
            .clone()
            .ok_or_else(|| AnalysisError::Unavailable("speech disabled".into()))
    }
}

// -- Voice transport -------------------------------------------------------

#[derive(Default)]
struct DriverState {
    channels: HashMap<GuildId, ChannelId>,
    active: HashMap<GuildId, oneshot::Sender<TrackEnd>>,
    paused: HashSet<GuildId>,
    volumes: HashMap<GuildId, f32>,
    recording: HashSet<GuildId>,
    recordings: HashMap<UserId, Bytes>,
    played: Vec<String>,
    failing_connects: usize,
    connect_calls: usize,
    fail_moves: bool,
    fail_recording: bool,
    stop_calls: usize,
}

#[derive(Clone, Default)]
pub struct FakeDriver {
    state: Arc<Mutex<DriverState>>,
}

impl FakeDriver {
    pub fn fail_next_connects(&self, count: usize) {
        self.state.lock().failing_connects = count;
    }

    pub fn connect_calls(&self) -> usize {
        self.state.lock().connect_calls
    }

    pub fn fail_moves(&self, fail: bool) {
        self.state.lock().fail_moves = fail;
    }

    pub fn fail_recording(&self, fail: bool) {
        self.state.lock().fail_recording = fail;
    }

    /// Titles handed to `play`, in order.
    pub fn played(&self) -> Vec<String> {
        self.state.lock().played.clone()
    }

    pub fn stop_calls(&self) -> usize {
        self.state.lock().stop_calls
    }

    pub fn is_recording(&self, guild: &GuildId) -> bool {
        self.state.lock().recording.contains(guild)
    }

    pub fn set_recording(&self, user: UserId, wav: Vec<u8>) {
        self.state.lock().recordings.insert(user, Bytes::from(wav));
    }

    /// End the active track naturally.
    pub fn finish(&self, guild: &GuildId) -> bool {
        self.end(guild, TrackEnd::Finished)
    }

    pub fn fail_playback(&self, guild: &GuildId, message: &str) -> bool {
        self.end(guild, TrackEnd::Errored(message.to_string()))
    }

    /// Drop the connection as if the platform kicked the bot.
    pub fn drop_connection(&self, guild: &GuildId) {
        let mut state = self.state.lock();
        state.channels.remove(guild);
        state.active.remove(guild);
    }

    fn end(&self, guild: &GuildId, reason: TrackEnd) -> bool {
        let sender = self.state.lock().active.remove(guild);
        match sender {
            Some(sender) => sender.send(reason).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl VoiceDriver for FakeDriver {
    async fn connect(&self, guild: &GuildId, channel: ChannelId) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.connect_calls += 1;
        if state.failing_connects > 0 {
            state.failing_connects -= 1;
            return Err(TransportError::Connect("handshake timed out".into()));
        }
        state.channels.insert(guild.clone(), channel);
        Ok(())
    }

    async fn move_to(&self, guild: &GuildId, channel: ChannelId) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.fail_moves {
            return Err(TransportError::Move("move rejected".into()));
        }
        state.channels.insert(guild.clone(), channel);
        Ok(())
    }

    async fn disconnect(&self, guild: &GuildId) {
        let mut state = self.state.lock();
        state.channels.remove(guild);
        state.recording.remove(guild);
        if let Some(sender) = state.active.remove(guild) {
            let _ = sender.send(TrackEnd::Stopped);
        }
    }

    fn current_channel(&self, guild: &GuildId) -> Option<ChannelId> {
        self.state.lock().channels.get(guild).copied()
    }

    async fn play(
        &self,
        guild: &GuildId,
        handle: StreamHandle,
        volume: f32,
    ) -> Result<oneshot::Receiver<TrackEnd>, TransportError> {
        let mut state = self.state.lock();
        if !state.channels.contains_key(guild) {
            return Err(TransportError::NotConnected);
        }

        let (tx, rx) = oneshot::channel();
        if let Some(previous) = state.active.insert(guild.clone(), tx) {
            let _ = previous.send(TrackEnd::Stopped);
        }
        state.paused.remove(guild);
        state.volumes.insert(guild.clone(), volume);
        state.played.push(handle.track.title);
        Ok(rx)
    }

    fn pause(&self, guild: &GuildId) -> bool {
        let mut state = self.state.lock();
        state.active.contains_key(guild) && state.paused.insert(guild.clone())
    }

    fn resume(&self, guild: &GuildId) -> bool {
        self.state.lock().paused.remove(guild)
    }

    fn stop(&self, guild: &GuildId) -> bool {
        let mut state = self.state.lock();
        state.stop_calls += 1;
        state.paused.remove(guild);
        match state.active.remove(guild) {
            Some(sender) => {
                let _ = sender.send(TrackEnd::Stopped);
                true
            }
            None => false,
        }
    }

    fn is_playing(&self, guild: &GuildId) -> bool {
        let state = self.state.lock();
        state.active.contains_key(guild) && !state.paused.contains(guild)
    }

    fn is_paused(&self, guild: &GuildId) -> bool {
        self.state.lock().paused.contains(guild)
    }

    fn set_volume(&self, guild: &GuildId, volume: f32) {
        self.state.lock().volumes.insert(guild.clone(), volume);
    }

    fn volume(&self, guild: &GuildId) -> Option<f32> {
        self.state.lock().volumes.get(guild).copied()
    }

    async fn start_recording(&self, guild: &GuildId) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if !state.channels.contains_key(guild) {
            return Err(TransportError::NotConnected);
        }
        if state.fail_recording {
            return Err(TransportError::Recording("receiver unavailable".into()));
        }
        state.recording.insert(guild.clone());
        Ok(())
    }

    async fn stop_recording(&self, guild: &GuildId) {
        self.state.lock().recording.remove(guild);
    }

    async fn take_recording(&self, _guild: &GuildId, user: UserId) -> Option<Bytes> {
        self.state.lock().recordings.remove(&user)
    }
}

// -- Notifier --------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<RoomEvent>>,
    posts: Mutex<Vec<(ChannelId, RoomEvent)>>,
    replies: Mutex<Vec<(ChannelId, MessageId, RoomEvent)>>,
    next_message: AtomicU64,
    fail_replies: AtomicBool,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<RoomEvent> {
        self.events.lock().clone()
    }

    pub fn posts(&self) -> Vec<(ChannelId, RoomEvent)> {
        self.posts.lock().clone()
    }

    pub fn replies(&self) -> Vec<(ChannelId, MessageId, RoomEvent)> {
        self.replies.lock().clone()
    }

    pub fn fail_replies(&self, fail: bool) {
        self.fail_replies.store(fail, Ordering::SeqCst);
    }

    /// Karaoke outcomes delivered by post or reply.
    pub fn karaoke_outcomes(&self) -> Vec<RoomEvent> {
        let is_outcome = |e: &RoomEvent| {
            matches!(
                e,
                RoomEvent::KaraokeResult { .. } | RoomEvent::KaraokeFailed { .. }
            )
        };
        let mut out: Vec<RoomEvent> = self
            .posts()
            .into_iter()
            .map(|(_, e)| e)
            .filter(is_outcome)
            .collect();
        out.extend(
            self.replies()
                .into_iter()
                .map(|(_, _, e)| e)
                .filter(is_outcome),
        );
        out
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.name() == name).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn emit(&self, _guild: &GuildId, event: RoomEvent) {
        self.events.lock().push(event);
    }

    async fn post(&self, channel: ChannelId, event: &RoomEvent) -> AnyResult<Option<MessageId>> {
        self.posts.lock().push((channel, event.clone()));
        let id = self.next_message.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Some(MessageId(id)))
    }

    async fn reply(
        &self,
        channel: ChannelId,
        message: MessageId,
        event: &RoomEvent,
    ) -> AnyResult<()> {
        if self.fail_replies.load(Ordering::SeqCst) {
            return Err("message was deleted".into());
        }
        self.replies.lock().push((channel, message, event.clone()));
        Ok(())
    }
}

// -- Scheduler harness -----------------------------------------------------

pub struct Harness {
    pub scheduler: Scheduler,
    pub driver: FakeDriver,
    pub backend: FakeBackend,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<MemoryStore>,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.voice.backoff_base_ms = 10;
    config.voice.reconnect_settle_ms = 10;
    config.karaoke.flush_wait_ms = 10;
    config.player.max_queue_size = 5;
    config
}

pub fn harness() -> Harness {
    harness_with(test_config(), CaptionManager::with_providers(Vec::new()))
}

pub fn harness_with(config: Config, captions: CaptionManager) -> Harness {
    let driver = FakeDriver::default();
    let backend = FakeBackend::default();
    let notifier = Arc::new(RecordingNotifier::default());
    let store = Arc::new(MemoryStore::new());

    let scorer = Scorer::new(
        Arc::new(NativeAnalyzer::new(&config.karaoke)),
        Arc::new(FakeSpeech::failing()),
        config.speech.locale.clone(),
        config.karaoke.min_overlap_secs,
    );

    let scheduler = Scheduler::builder(config)
        .resolver(TrackResolver::with_backend(Box::new(backend.clone())))
        .captions(captions)
        .store(store.clone())
        .scorer(scorer)
        .build(Arc::new(driver.clone()), notifier.clone());

    Harness {
        scheduler,
        driver,
        backend,
        notifier,
        store,
    }
}

impl Harness {
    /// Register a resolvable track under `query`.
    pub fn song(&self, query: &str, title: &str) {
        let slug = title.to_lowercase().replace(' ', "-");
        self.backend
            .insert(query, media(title, &format!("https://youtu.be/{}", slug)));
    }
}

/// Let spawned watchers and timers run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
