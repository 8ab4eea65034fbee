//! Karaoke sessions and the scoring pipeline behind them.

pub mod analysis;
pub mod pipeline;
pub mod scoring;
pub mod session;
pub mod speech;
pub mod waveform;

pub use pipeline::{AcousticAnalyzer, NativeAnalyzer, Scorer};
pub use scoring::{Grade, ScoreResult, SubScores};
pub use session::{KaraokePhase, KaraokeSession, KaraokeStart, karaoke_queries};
pub use speech::{GoogleSpeechRecognizer, SpeechRecognizer};
