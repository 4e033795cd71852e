//! Collaborator doubles shared by the pipeline and transport tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::{LlmError, TranslationRequest, TranslationResult, Translator};
use crate::stt::MockRecognizer;
use crate::tts::{AudioSink, PlaybackTarget, SpeechAudio, SynthesisError, Synthesizer};

use super::session::Collaborators;

/// Answers every request by upper-casing it.
pub struct Upper;

#[async_trait]
impl Translator for Upper {
    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult, LlmError> {
        Ok(TranslationResult {
            translated_text: request.source_text.to_uppercase(),
        })
    }

    async fn greeting(&self) -> Result<String, LlmError> {
        Ok("HI".into())
    }
}

/// Produces a few bytes of silence and discards them on playback.
pub struct Silent;

#[async_trait]
impl Synthesizer for Silent {
    async fn synthesize(&self, _text: &str) -> Result<SpeechAudio, SynthesisError> {
        Ok(SpeechAudio {
            pcm: vec![0; 2],
            sample_rate: 24_000,
        })
    }
}

#[async_trait]
impl AudioSink for Silent {
    async fn play(&self, _target: &PlaybackTarget, _audio: SpeechAudio) -> Result<(), SynthesisError> {
        Ok(())
    }
}

pub fn collaborators() -> Collaborators {
    Collaborators {
        translator: Arc::new(Upper),
        recognizer: Arc::new(MockRecognizer::ok("")),
        synthesizer: Arc::new(Silent),
        sink: Arc::new(Silent),
    }
}
