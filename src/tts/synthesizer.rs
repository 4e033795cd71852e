//! Speech synthesizer trait and the hosted Cartesia implementation.
//!
//! [`CartesiaSynthesizer`] calls `POST /tts/bytes` and receives the whole
//! utterance as raw little-endian 16-bit PCM, which the session hands to an
//! [`AudioSink`](crate::tts::AudioSink).

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::TtsConfig;
use crate::metrics::UsageCollector;

// ---------------------------------------------------------------------------
// SynthesisError
// ---------------------------------------------------------------------------

/// Recoverable synthesis / playback failures.  Each one abandons the turn.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("TTS request failed: {0}")]
    Request(String),

    #[error("TTS endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("TTS request timed out")]
    Timeout,

    /// The synthesizer refused the input or produced no audio.
    #[error("synthesizer rejected the text: {0}")]
    Rejected(String),

    /// Audio was produced but could not be delivered to the user.
    #[error("playback failed: {0}")]
    Playback(String),
}

impl From<reqwest::Error> for SynthesisError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SynthesisError::Timeout
        } else {
            SynthesisError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechAudio
// ---------------------------------------------------------------------------

/// Mono `pcm_s16le` audio for one spoken translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechAudio {
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
}

impl SpeechAudio {
    /// Playback length in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        // 2 bytes per sample, mono.
        (self.pcm.len() as u64 / 2) * 1000 / self.sample_rate as u64
    }
}

// ---------------------------------------------------------------------------
// Synthesizer trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Render `text` with the configured voice.
    async fn synthesize(&self, text: &str) -> Result<SpeechAudio, SynthesisError>;
}

// ---------------------------------------------------------------------------
// CartesiaSynthesizer
// ---------------------------------------------------------------------------

pub struct CartesiaSynthesizer {
    client: reqwest::Client,
    config: TtsConfig,
    api_key: String,
    usage: Option<Arc<UsageCollector>>,
}

impl CartesiaSynthesizer {
    pub fn new(config: &TtsConfig, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
            api_key: api_key.into(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, usage: Arc<UsageCollector>) -> Self {
        self.usage = Some(usage);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/tts/bytes", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Synthesizer for CartesiaSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SpeechAudio, SynthesisError> {
        if text.trim().is_empty() {
            return Err(SynthesisError::Rejected("empty text".into()));
        }

        let response = self
            .client
            .post(self.endpoint())
            .header("X-API-Key", &self.api_key)
            .header("Cartesia-Version", &self.config.api_version)
            .json(&tts_body(&self.config, text))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 400 || status.as_u16() == 422 {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Rejected(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let pcm = response.bytes().await?.to_vec();
        if pcm.is_empty() {
            return Err(SynthesisError::Rejected("no audio returned".into()));
        }

        if let Some(usage) = &self.usage {
            usage.record_tts(text);
        }

        Ok(SpeechAudio {
            pcm,
            sample_rate: self.config.sample_rate,
        })
    }
}

/// JSON body of a `/tts/bytes` request producing raw PCM.
pub(crate) fn tts_body(config: &TtsConfig, text: &str) -> serde_json::Value {
    serde_json::json!({
        "model_id":   config.model,
        "transcript": text,
        "voice": { "mode": "id", "id": config.voice_id },
        "language":   config.language,
        "output_format": {
            "container":   "raw",
            "encoding":    "pcm_s16le",
            "sample_rate": config.sample_rate
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_selects_voice_and_raw_pcm() {
        let config = TtsConfig::default();
        let body = tts_body(&config, "Hello");

        assert_eq!(body["transcript"], "Hello");
        assert_eq!(body["voice"]["id"], "6f84f4b8-58a2-430c-8c79-688dad597532");
        assert_eq!(body["voice"]["mode"], "id");
        assert_eq!(body["output_format"]["encoding"], "pcm_s16le");
        assert_eq!(body["output_format"]["sample_rate"], 24_000);
        assert_eq!(body["language"], "en");
    }

    #[test]
    fn endpoint_appends_tts_bytes() {
        let synth = CartesiaSynthesizer::new(&TtsConfig::default(), "key");
        assert_eq!(synth.endpoint(), "https://api.cartesia.ai/tts/bytes");
    }

    #[test]
    fn duration_from_pcm_length() {
        let audio = SpeechAudio {
            pcm: vec![0; 48_000],
            sample_rate: 24_000,
        };
        assert_eq!(audio.duration_ms(), 1000);
    }

    #[test]
    fn zero_sample_rate_has_zero_duration() {
        let audio = SpeechAudio {
            pcm: vec![0; 10],
            sample_rate: 0,
        };
        assert_eq!(audio.duration_ms(), 0);
    }

    #[tokio::test]
    async fn empty_text_is_rejected_without_a_request() {
        let synth = CartesiaSynthesizer::new(&TtsConfig::default(), "key");
        let err = synth.synthesize("   ").await.unwrap_err();
        assert!(matches!(err, SynthesisError::Rejected(_)));
    }
}
