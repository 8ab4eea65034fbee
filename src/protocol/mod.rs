pub mod events;
pub mod tracks;

pub use events::RoomEvent;
pub use tracks::{StreamHandle, TrackRef};
