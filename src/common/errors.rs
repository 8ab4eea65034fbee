use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Exception severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Common,
    Suspicious,
    Fault,
}

/// Mistakes made by the caller. Reported as-is, never change session state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("join a voice channel first")]
    NotInVoice,
    #[error("already connected to this voice channel")]
    AlreadyConnected,
    #[error("nothing is playing")]
    NothingPlaying,
    #[error("playback is already paused")]
    AlreadyPaused,
    #[error("playback is not paused")]
    NotPaused,
    #[error("the queue is empty")]
    QueueEmpty,
    #[error("the queue is full ({0} tracks)")]
    QueueFull(usize),
    #[error("invalid position {index}; the queue holds {len} tracks")]
    InvalidIndex { index: usize, len: usize },
    #[error("volume must be between 0 and 100, got {0}")]
    InvalidVolume(i64),
    #[error("at least two queued tracks are needed to shuffle")]
    NotEnoughToShuffle,
    #[error("a karaoke session is already running in this room")]
    KaraokeActive,
    #[error("no karaoke session is running in this room")]
    NoKaraoke,
    #[error("only the participant who started karaoke can stop it")]
    NotKaraokeOwner,
    #[error("no saved queue named '{0}'")]
    PlaylistNotFound(String),
}

/// Why a track is not accessible on the backing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Restriction {
    Private,
    RegionBlocked,
    MembersOnly,
    Unavailable,
}

impl std::fmt::Display for Restriction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Private => "the video is private",
            Self::RegionBlocked => "the video is blocked or region restricted",
            Self::MembersOnly => "the video is members-only content",
            Self::Unavailable => "the video is unavailable",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no results found")]
    NotFound,
    #[error("{0}")]
    Restricted(Restriction),
    #[error("could not load the track: {0}")]
    ResolutionFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("voice connection failed: {0}")]
    Connect(String),
    #[error("moving to the voice channel failed: {0}")]
    Move(String),
    #[error("playback could not start: {0}")]
    Play(String),
    #[error("recording failed: {0}")]
    Recording(String),
    #[error("not connected to a voice channel")]
    NotConnected,
}

/// Failure of one optional analysis step. Always degrades to the baseline score.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("analysis unavailable: {0}")]
    Unavailable(String),
    #[error("not enough data: {got} usable frames, {needed} required")]
    Insufficient { got: usize, needed: usize },
    #[error("analysis failed: {0}")]
    Failed(String),
}

pub type Analysis<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored data is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("karaoke recording could not be saved: {0}")]
    Artifact(String),
}

impl PlayerError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::User(_) => Severity::Common,
            Self::Resolve(_) => Severity::Suspicious,
            Self::Transport(_) | Self::Store(_) | Self::Artifact(_) => Severity::Fault,
        }
    }

    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::User(_))
    }
}
