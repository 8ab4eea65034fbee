use std::{
    collections::VecDeque,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use tokio::time::Instant;
use uuid::Uuid;

use crate::{
    common::types::{ChannelId, GuildId},
    karaoke::KaraokeSession,
    player::{
        captions::CaptionTask,
        state::{LoopMode, PlaybackClock, PlaybackStatus},
    },
    protocol::tracks::TrackRef,
};

static NEXT_PLAY_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Why the current track is playing. Decides what its end triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayPurpose {
    Music,
    Karaoke(Uuid),
}

/// Playback state of one room. Only touched under the room's lock.
pub struct RoomSession {
    pub guild_id: GuildId,
    pub queue: VecDeque<TrackRef>,
    pub now_playing: Option<TrackRef>,
    pub purpose: PlayPurpose,
    pub loop_mode: LoopMode,
    pub status: PlaybackStatus,
    pub clock: PlaybackClock,
    pub caption_task: Option<CaptionTask>,
    pub karaoke: Option<KaraokeSession>,
    /// Voice channel playback was last requested for.
    pub voice_channel: Option<ChannelId>,
    /// Identifies the transport start whose end signal may advance this room.
    pub play_token: Option<u64>,
    /// Token of the start a skip has already been requested for.
    pub skip_pending: Option<u64>,
}

impl RoomSession {
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            queue: VecDeque::new(),
            now_playing: None,
            purpose: PlayPurpose::Music,
            loop_mode: LoopMode::Off,
            status: PlaybackStatus::Idle,
            clock: PlaybackClock::default(),
            caption_task: None,
            karaoke: None,
            voice_channel: None,
            play_token: None,
            skip_pending: None,
        }
    }

    /// Allocate a token unique across all rooms and make it current.
    pub fn issue_token(&mut self) -> u64 {
        let token = NEXT_PLAY_TOKEN.fetch_add(1, Ordering::Relaxed);
        self.play_token = Some(token);
        self.skip_pending = None;
        token
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.play_token == Some(token)
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            PlaybackStatus::Playing | PlaybackStatus::Paused | PlaybackStatus::Staging
        )
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.clock.elapsed(now)
    }

    /// Forget the current track. Any pending end signal becomes stale.
    /// The caption task is handed back so the caller can await its cancellation.
    #[must_use = "the caption task must be cancelled"]
    pub fn clear_playback(&mut self) -> Option<CaptionTask> {
        self.now_playing = None;
        self.purpose = PlayPurpose::Music;
        self.status = PlaybackStatus::Idle;
        self.clock.reset();
        self.play_token = None;
        self.skip_pending = None;
        self.caption_task.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::track;

    #[test]
    fn test_tokens_are_unique_and_clear_makes_them_stale() {
        let mut a = RoomSession::new(GuildId::from(1u64));
        let mut b = RoomSession::new(GuildId::from(2u64));

        let ta = a.issue_token();
        let tb = b.issue_token();
        assert_ne!(ta, tb);
        assert!(a.is_current(ta));
        assert!(!a.is_current(tb));

        a.now_playing = Some(track("One"));
        a.status = PlaybackStatus::Playing;
        assert!(a.clear_playback().is_none());
        assert!(!a.is_current(ta));
        assert!(a.now_playing.is_none());
        assert_eq!(a.status, PlaybackStatus::Idle);
    }
}
