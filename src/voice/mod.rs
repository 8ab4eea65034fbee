pub(crate) mod backoff;
pub mod connect;
pub mod driver;

pub use connect::ensure_connected;
pub use driver::{TrackEnd, VoiceDriver};
