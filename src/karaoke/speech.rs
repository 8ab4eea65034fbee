use std::{io::Cursor, path::Path, time::Duration};

use async_trait::async_trait;
use base64::Engine;
use serde_json::{Value, json};

use crate::{
    common::errors::{Analysis, AnalysisError},
    configs::SpeechConfig,
};

/// Speech-to-text over a recorded artifact.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn transcribe(&self, audio: &Path, locale: &str) -> Analysis<String>;
}

/// Google Cloud Speech `speech:recognize` over REST.
pub struct GoogleSpeechRecognizer {
    client: reqwest::Client,
    config: SpeechConfig,
}

impl GoogleSpeechRecognizer {
    pub fn new(config: SpeechConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs.max(1)))
                .build()
                .unwrap_or_default(),
            config,
        }
    }
}

#[async_trait]
impl SpeechRecognizer for GoogleSpeechRecognizer {
    async fn transcribe(&self, audio: &Path, locale: &str) -> Analysis<String> {
        let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) else {
            return Err(AnalysisError::Unavailable("no speech API key configured".into()));
        };

        let bytes = tokio::fs::read(audio)
            .await
            .map_err(|e| AnalysisError::Unavailable(format!("{}: {}", audio.display(), e)))?;

        let body = request_body(&bytes, locale);
        let resp = self
            .client
            .post(&self.config.endpoint)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::Failed(format!("speech request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AnalysisError::Failed(format!("speech service returned {}", status)));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| AnalysisError::Failed(format!("unreadable speech response: {}", e)))?;

        transcript(&json).ok_or_else(|| AnalysisError::Failed("no speech recognized".into()))
    }
}

fn request_body(wav: &[u8], locale: &str) -> Value {
    let mut config = json!({
        "languageCode": locale,
        "encoding": "LINEAR16",
    });

    if let Some((channels, rate)) = wav_format(wav) {
        config["sampleRateHertz"] = json!(rate);
        config["audioChannelCount"] = json!(channels);
    }

    json!({
        "config": config,
        "audio": { "content": base64::engine::general_purpose::STANDARD.encode(wav) },
    })
}

/// Channel count and sample rate from the recording's `fmt ` chunk.
fn wav_format(wav: &[u8]) -> Option<(u16, u32)> {
    let spec = hound::WavReader::new(Cursor::new(wav)).ok()?.spec();
    Some((spec.channels, spec.sample_rate))
}

/// Best alternative of every result, joined with spaces.
fn transcript(json: &Value) -> Option<String> {
    let text = json["results"]
        .as_array()?
        .iter()
        .filter_map(|r| r["alternatives"][0]["transcript"].as_str())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    (!text.is_empty()).then_some(text)
}
