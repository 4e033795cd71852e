//! Speech recognizer trait and the hosted Cartesia implementation.
//!
//! # Overview
//!
//! [`Recognizer`] is the seam the session worker uses when a room delivers a
//! recorded audio clip instead of a ready-made transcript.  It is object-safe
//! and `Send + Sync` so it can be held behind an `Arc<dyn Recognizer>`.
//!
//! [`CartesiaRecognizer`] uploads the clip to Cartesia's batch `/stt`
//! endpoint and turns the answer into one final [`Utterance`].
//!
//! [`MockRecognizer`] (available under `#[cfg(test)]`) returns a
//! pre-configured response.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::SttConfig;
use crate::metrics::UsageCollector;
use crate::stt::utterance::Utterance;

// ---------------------------------------------------------------------------
// RecognitionError
// ---------------------------------------------------------------------------

/// Recoverable recognition failures.  Each one abandons the current turn.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecognitionError {
    /// The audio clip could not be read.
    #[error("cannot read audio clip: {0}")]
    Io(String),

    /// HTTP transport or connection error.
    #[error("STT request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status.
    #[error("STT endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("STT request timed out")]
    Timeout,

    /// The recognizer's answer could not be understood.
    #[error("failed to parse STT response: {0}")]
    Parse(String),

    /// A transcript event arrived in a shape the controller cannot use.
    #[error("malformed utterance: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for RecognitionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RecognitionError::Timeout
        } else {
            RecognitionError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// AudioClip
// ---------------------------------------------------------------------------

/// An encoded audio file (WAV, MP3, …) to be transcribed.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl AudioClip {
    /// Read a clip from disk.
    pub async fn read(path: &std::path::Path) -> Result<Self, RecognitionError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RecognitionError::Io(format!("{}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "clip.wav".into());
        Ok(Self { file_name, bytes })
    }
}

// ---------------------------------------------------------------------------
// Recognizer trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Transcribe `clip` into a single final utterance.
    ///
    /// An empty transcript is returned as a blank utterance, not an error;
    /// the turn controller owns the empty-text guard.
    async fn transcribe(&self, clip: AudioClip) -> Result<Utterance, RecognitionError>;
}

// Compile-time assertion: Box<dyn Recognizer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn Recognizer>) {}
};

// ---------------------------------------------------------------------------
// CartesiaRecognizer
// ---------------------------------------------------------------------------

/// Batch client for Cartesia's `POST /stt` endpoint.
pub struct CartesiaRecognizer {
    client: reqwest::Client,
    config: SttConfig,
    api_key: String,
    usage: Option<Arc<UsageCollector>>,
}

impl CartesiaRecognizer {
    pub fn new(config: &SttConfig, api_key: impl Into<String>) -> Self {
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
        format!("{}/stt", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Recognizer for CartesiaRecognizer {
    async fn transcribe(&self, clip: AudioClip) -> Result<Utterance, RecognitionError> {
        let part = reqwest::multipart::Part::bytes(clip.bytes).file_name(clip.file_name);
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("language", self.config.language.clone());

        let response = self
            .client
            .post(self.endpoint())
            .header("X-API-Key", &self.api_key)
            .header("Cartesia-Version", &self.config.api_version)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecognitionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RecognitionError::Parse(e.to_string()))?;

        let utterance = parse_transcription(&json, &self.config.language)?;
        if let Some(usage) = &self.usage {
            usage.record_stt((utterance.duration_secs() * 1000.0) as u64);
        }
        Ok(utterance)
    }
}

/// Turn a batch transcription response into a final utterance.
///
/// Expected shape: `{"text": "...", "language": "zh", "duration": 1.23}`;
/// `language` and `duration` are optional.
pub(crate) fn parse_transcription(
    json: &serde_json::Value,
    fallback_language: &str,
) -> Result<Utterance, RecognitionError> {
    let text = json["text"]
        .as_str()
        .ok_or_else(|| RecognitionError::Parse("response has no `text` field".into()))?
        .trim();
    let language = json["language"].as_str().unwrap_or(fallback_language);
    let duration = json["duration"].as_f64().unwrap_or(0.0).max(0.0);

    Ok(Utterance::committed(text, language, 0.0, duration))
}

// ---------------------------------------------------------------------------
// MockRecognizer  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns a pre-configured response.
#[cfg(test)]
pub struct MockRecognizer {
    response: Result<String, RecognitionError>,
}

#[cfg(test)]
impl MockRecognizer {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
        }
    }

    pub fn err(error: RecognitionError) -> Self {
        Self {
            response: Err(error),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl Recognizer for MockRecognizer {
    async fn transcribe(&self, _clip: AudioClip) -> Result<Utterance, RecognitionError> {
        self.response
            .clone()
            .map(|text| Utterance::committed(text, "zh", 0.0, 1.0))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_full_response() {
        let u = parse_transcription(
            &json!({ "type": "transcript", "text": " 你好 ", "language": "zh", "duration": 1.5 }),
            "zh",
        )
        .unwrap();
        assert_eq!(u.text, "你好");
        assert!(u.is_final);
        assert_eq!(u.end_time, 1.5);
    }

    #[test]
    fn missing_language_uses_hint() {
        let u = parse_transcription(&json!({ "text": "谢谢" }), "zh").unwrap();
        assert_eq!(u.language, "zh");
        assert_eq!(u.duration_secs(), 0.0);
    }

    #[test]
    fn empty_text_is_not_an_error() {
        let u = parse_transcription(&json!({ "text": "" }), "zh").unwrap();
        assert!(u.is_blank());
    }

    #[test]
    fn missing_text_is_parse_error() {
        let err = parse_transcription(&json!({ "error": "bad audio" }), "zh").unwrap_err();
        assert!(matches!(err, RecognitionError::Parse(_)));
    }

    #[test]
    fn endpoint_appends_stt() {
        let config = SttConfig {
            base_url: "https://api.cartesia.ai/".into(),
            ..SttConfig::default()
        };
        let r = CartesiaRecognizer::new(&config, "key");
        assert_eq!(r.endpoint(), "https://api.cartesia.ai/stt");
    }

    #[tokio::test]
    async fn reads_clip_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.wav");
        std::fs::write(&path, b"RIFF....").unwrap();

        let clip = AudioClip::read(&path).await.unwrap();
        assert_eq!(clip.file_name, "hello.wav");
        assert_eq!(clip.bytes, b"RIFF....");
    }

    #[tokio::test]
    async fn missing_clip_is_io_error() {
        let err = AudioClip::read(std::path::Path::new("/definitely/not/here.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, RecognitionError::Io(_)));
    }

    #[tokio::test]
    async fn mock_returns_committed_utterance() {
        let u = MockRecognizer::ok("你好")
            .transcribe(AudioClip {
                file_name: "a.wav".into(),
                bytes: vec![],
            })
            .await
            .unwrap();
        assert!(u.is_final);
        assert_eq!(u.text, "你好");
    }
}
