use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct KaraokeConfig {
    /// Time given to the voice receiver to flush buffered audio after recording stops.
    pub flush_wait_ms: u64,
    /// Sample rate both recordings are resampled to before analysis.
    pub sample_rate: u32,
    /// Minimum overlap (seconds) between the two recordings for acoustic analysis.
    pub min_overlap_secs: f32,
    /// Appended to free-text queries to find an instrumental version.
    pub backing_suffix: String,
    /// Appended to free-text queries to find the original when the backing flag is off.
    pub original_suffix: String,
    pub pitch: PitchConfig,
}

impl Default for KaraokeConfig {
    fn default() -> Self {
        Self {
            flush_wait_ms: 1_000,
            sample_rate: 22_050,
            min_overlap_secs: 1.0,
            backing_suffix: "mr".to_string(),
            original_suffix: "original".to_string(),
            pitch: PitchConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PitchConfig {
    pub fmin: f32,
    pub fmax: f32,
    pub frame_length: usize,
    pub hop_length: usize,
    /// YIN absolute threshold on the cumulative mean normalized difference.
    pub threshold: f32,
    pub rms_frame_length: usize,
    pub rms_hop_length: usize,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            fmin: 80.0,
            fmax: 1_000.0,
            frame_length: 1_024,
            hop_length: 1_024,
            threshold: 0.1,
            rms_frame_length: 2_048,
            rms_hop_length: 512,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SpeechConfig {
    /// API key for the speech service. Speech scoring stays at baseline without one.
    pub api_key: Option<String>,
    pub endpoint: String,
    pub locale: String,
    pub timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://speech.googleapis.com/v1/speech:recognize".to_string(),
            locale: "ko-KR".to_string(),
            timeout_secs: 30,
        }
    }
}
