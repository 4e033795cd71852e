//! Delivery of synthesized speech to the user.
//!
//! The room transport in this crate carries events, not media, so the
//! production sink is [`FileSink`]: one raw PCM file per spoken turn, laid out
//! as `<root>/<room>/<user>/turn-<turn>-<request>.pcm`.  `play` returning
//! `Ok(())` is the playback-complete signal.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::tts::synthesizer::{SpeechAudio, SynthesisError};

/// Who a piece of audio is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackTarget {
    pub room: String,
    pub user: String,
    pub turn: u64,
    pub request: u64,
}

#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Deliver `audio` and return once playback has finished.
    async fn play(&self, target: &PlaybackTarget, audio: SpeechAudio) -> Result<(), SynthesisError>;
}

// ---------------------------------------------------------------------------
// FileSink
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FileSink {
    root: PathBuf,
}

impl FileSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File the audio for `target` is written to.
    pub fn path_for(&self, target: &PlaybackTarget) -> PathBuf {
        self.root
            .join(sanitize(&target.room))
            .join(sanitize(&target.user))
            .join(format!("turn-{}-{}.pcm", target.turn, target.request))
    }
}

#[async_trait]
impl AudioSink for FileSink {
    async fn play(&self, target: &PlaybackTarget, audio: SpeechAudio) -> Result<(), SynthesisError> {
        let path = self.path_for(target);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SynthesisError::Playback(format!("{}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, &audio.pcm)
            .await
            .map_err(|e| SynthesisError::Playback(format!("{}: {e}", path.display())))?;

        log::debug!(
            "wrote {} ms of speech to {}",
            audio.duration_ms(),
            path.display()
        );
        Ok(())
    }
}

/// Keep ids usable as a single path component.
fn sanitize(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".into()
    } else {
        cleaned
    }
}
