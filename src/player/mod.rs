pub mod captions;
pub mod context;
pub mod manager;
pub mod state;

pub use captions::CaptionTask;
pub use context::{PlayPurpose, RoomSession};
pub use state::{LoopMode, NowPlaying, PlaybackClock, PlaybackStatus};
