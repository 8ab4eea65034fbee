pub mod manager;
pub mod plugin;
pub mod ytdlp;

pub use manager::TrackResolver;
pub use plugin::{BackendError, BoxedBackend, MediaBackend, MediaInfo};
