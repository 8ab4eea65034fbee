use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::oneshot;

use crate::{
    common::{
        errors::TransportError,
        types::{ChannelId, GuildId, UserId},
    },
    protocol::tracks::StreamHandle,
};

/// How a track left the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackEnd {
    Finished,
    Stopped,
    Errored(String),
}

/// The voice transport of the chat platform, one connection per room.
///
/// `play` hands back a receiver that resolves exactly once, strictly after the track has
/// fully stopped (naturally, through `stop`, or through an error). Dropping the sender
/// without a value counts as `Stopped`.
#[async_trait]
pub trait VoiceDriver: Send + Sync {
    async fn connect(&self, guild: &GuildId, channel: ChannelId) -> Result<(), TransportError>;

    async fn move_to(&self, guild: &GuildId, channel: ChannelId) -> Result<(), TransportError>;

    async fn disconnect(&self, guild: &GuildId);

    fn current_channel(&self, guild: &GuildId) -> Option<ChannelId>;

    /// Start `handle` at `volume` (0.0 - 1.0), replacing anything already playing.
    async fn play(
        &self,
        guild: &GuildId,
        handle: StreamHandle,
        volume: f32,
    ) -> Result<oneshot::Receiver<TrackEnd>, TransportError>;

    fn pause(&self, guild: &GuildId) -> bool;

    fn resume(&self, guild: &GuildId) -> bool;

    /// Stop the active source. Its end signal fires with `Stopped`.
    fn stop(&self, guild: &GuildId) -> bool;

    fn is_playing(&self, guild: &GuildId) -> bool;

    fn is_paused(&self, guild: &GuildId) -> bool;

    fn set_volume(&self, guild: &GuildId, volume: f32);

    fn volume(&self, guild: &GuildId) -> Option<f32>;

    /// Begin capturing every participant's audio in the room's voice channel.
    async fn start_recording(&self, guild: &GuildId) -> Result<(), TransportError>;

    async fn stop_recording(&self, guild: &GuildId);

    /// Captured audio of `user` as a WAV file, if any was received.
    async fn take_recording(&self, guild: &GuildId, user: UserId) -> Option<Bytes>;
}
