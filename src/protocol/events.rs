use serde::Serialize;

use crate::{
    common::types::{GuildId, UserId},
    karaoke::ScoreResult,
    protocol::tracks::TrackRef,
};

/// Notifications raised by a room's playback session for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RoomEvent {
    #[serde(rename = "TrackStartEvent")]
    TrackStart { track: TrackRef },

    #[serde(rename = "TrackExceptionEvent")]
    TrackException { track: TrackRef, message: String },

    #[serde(rename = "QueueEndEvent")]
    QueueEnded,

    #[serde(rename = "CaptionsFoundEvent")]
    CaptionsFound { title: String, lines: usize },

    #[serde(rename = "CaptionsNotFoundEvent")]
    CaptionsNotFound { title: String },

    #[serde(rename = "CaptionLineEvent")]
    CaptionLine {
        #[serde(rename = "lineIndex")]
        line_index: usize,
        line: String,
    },

    #[serde(rename = "KaraokeStartEvent")]
    KaraokeStarted { backing: TrackRef, reference: TrackRef },

    #[serde(rename = "KaraokeResultEvent")]
    KaraokeResult {
        title: String,
        uri: String,
        singer: UserId,
        score: ScoreResult,
    },

    #[serde(rename = "KaraokeFailedEvent")]
    KaraokeFailed { title: String, reason: String },

    #[serde(rename = "DisconnectedEvent")]
    Disconnected {
        #[serde(rename = "guildId")]
        guild_id: GuildId,
    },
}

impl RoomEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TrackStart { .. } => "TrackStartEvent",
            Self::TrackException { .. } => "TrackExceptionEvent",
            Self::QueueEnded => "QueueEndEvent",
            Self::CaptionsFound { .. } => "CaptionsFoundEvent",
            Self::CaptionsNotFound { .. } => "CaptionsNotFoundEvent",
            Self::CaptionLine { .. } => "CaptionLineEvent",
            Self::KaraokeStarted { .. } => "KaraokeStartEvent",
            Self::KaraokeResult { .. } => "KaraokeResultEvent",
            Self::KaraokeFailed { .. } => "KaraokeFailedEvent",
            Self::Disconnected { .. } => "DisconnectedEvent",
        }
    }
}
