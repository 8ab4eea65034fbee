//! Per-room playback scheduling and karaoke scoring for chat voice bots.
//!
//! The embedding application supplies a [`VoiceDriver`] (the platform's voice
//! transport) and a [`Notifier`] (its presentation layer); [`Scheduler`] does the rest.

pub mod common;
pub mod configs;
pub mod karaoke;
pub mod lyrics;
pub mod player;
pub mod protocol;
pub mod server;
pub mod sources;
pub mod store;
pub mod voice;

#[cfg(test)]
pub(crate) mod test_support;

pub use common::errors::{PlayerError, UserError};
pub use configs::Config;
pub use server::{ChannelNotifier, Enqueued, Notifier, Scheduler};
pub use voice::VoiceDriver;
