use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use tracing::debug;

use super::{
    analysis::{pitch_contour, rms_envelope},
    scoring::{self, ScoreResult, SubScores},
    speech::SpeechRecognizer,
    waveform::load_waveform,
};
use crate::{
    common::errors::{Analysis, AnalysisError},
    configs::{KaraokeConfig, PitchConfig},
};

/// Waveform loading and frame features, all at one analysis sample rate.
#[async_trait]
pub trait AcousticAnalyzer: Send + Sync {
    fn sample_rate(&self) -> u32;

    async fn load_waveform(&self, path: &Path) -> Analysis<Vec<f32>>;

    /// Voiced-frame fundamental frequencies in Hz.
    fn pitch_contour(&self, waveform: &[f32]) -> Vec<f32>;

    fn rms_envelope(&self, waveform: &[f32]) -> Vec<f32>;
}

/// Local decoding and feature extraction.
pub struct NativeAnalyzer {
    sample_rate: u32,
    pitch: PitchConfig,
}

impl NativeAnalyzer {
    pub fn new(config: &KaraokeConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            pitch: config.pitch.clone(),
        }
    }
}

#[async_trait]
impl AcousticAnalyzer for NativeAnalyzer {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    async fn load_waveform(&self, path: &Path) -> Analysis<Vec<f32>> {
        let path = path.to_path_buf();
        let rate = self.sample_rate;
        tokio::task::spawn_blocking(move || load_waveform(&path, rate))
            .await
            .map_err(|e| AnalysisError::Failed(format!("decoder task failed: {}", e)))?
    }

    fn pitch_contour(&self, waveform: &[f32]) -> Vec<f32> {
        pitch_contour(waveform, self.sample_rate, &self.pitch)
    }

    fn rms_envelope(&self, waveform: &[f32]) -> Vec<f32> {
        rms_envelope(
            waveform,
            self.pitch.rms_frame_length,
            self.pitch.rms_hop_length,
        )
    }
}

/// Produces a `ScoreResult` for a recording. Never fails: every step that cannot run
/// leaves its sub-scores at the baseline.
pub struct Scorer {
    analyzer: Arc<dyn AcousticAnalyzer>,
    speech: Arc<dyn SpeechRecognizer>,
    locale: String,
    min_overlap_secs: f32,
}

impl Scorer {
    pub fn new(
        analyzer: Arc<dyn AcousticAnalyzer>,
        speech: Arc<dyn SpeechRecognizer>,
        locale: String,
        min_overlap_secs: f32,
    ) -> Self {
        Self {
            analyzer,
            speech,
            locale,
            min_overlap_secs,
        }
    }

    pub async fn score(&self, recording: &Path, reference: Option<&Path>) -> ScoreResult {
        let mut scores = SubScores::default();

        let recognized = match self.speech.transcribe(recording, &self.locale).await {
            Ok(text) if !text.trim().is_empty() => {
                let (pronunciation, length) =
                    scoring::speech_scores(text.split_whitespace().count());
                scores.pronunciation = pronunciation;
                scores.length = length;
                Some(text)
            }
            Ok(_) => None,
            Err(e) => {
                debug!("Speech analysis skipped: {}", e);
                None
            }
        };

        match reference {
            Some(reference) => {
                if let Err(e) = self.acoustic(recording, reference, &mut scores).await {
                    debug!("Acoustic analysis skipped: {}", e);
                }
            }
            None => debug!("Acoustic analysis skipped: no reference audio"),
        }

        ScoreResult::new(scores, recognized)
    }

    async fn acoustic(
        &self,
        recording: &Path,
        reference: &Path,
        scores: &mut SubScores,
    ) -> Analysis<()> {
        let (user, original) = futures::join!(
            self.analyzer.load_waveform(recording),
            self.analyzer.load_waveform(reference)
        );
        let (mut user, mut original) = (user?, original?);

        let common = user.len().min(original.len());
        let needed = (self.min_overlap_secs * self.analyzer.sample_rate() as f32) as usize;
        if common <= needed {
            return Err(AnalysisError::Insufficient {
                got: common,
                needed: needed + 1,
            });
        }
        user.truncate(common);
        original.truncate(common);

        let analyzer = self.analyzer.clone();
        let features = tokio::task::spawn_blocking(move || {
            (
                analyzer.pitch_contour(&user),
                analyzer.pitch_contour(&original),
                analyzer.rms_envelope(&user),
                analyzer.rms_envelope(&original),
            )
        })
        .await
        .map_err(|e| AnalysisError::Failed(format!("feature task failed: {}", e)))?;
        let (user_f0, original_f0, user_rms, original_rms) = features;

        match scoring::pitch_stability(&user_f0) {
            Ok(score) => scores.pitch_stability = score,
            Err(e) => debug!("Pitch stability at baseline: {}", e),
        }
        match scoring::pitch_match(&original_f0, &user_f0) {
            Ok(score) => scores.pitch_match = score,
            Err(e) => debug!("Pitch match at baseline: {}", e),
        }
        match scoring::energy_match(&original_rms, &user_rms) {
            Ok(score) => scores.energy_match = score,
            Err(e) => debug!("Energy match at baseline: {}", e),
        }

        Ok(())
    }
}
