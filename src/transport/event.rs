//! Wire format of room events: one JSON object per line.
//!
//! ```text
//! {"type":"join","user":"alice"}
//! {"type":"speech_started","user":"alice"}
//! {"type":"transcript","user":"alice","text":"你","is_final":false}
//! {"type":"transcript","user":"alice","text":"你好","is_final":true,"start_time":0.0,"end_time":0.8}
//! {"type":"audio","user":"alice","path":"/tmp/clip.wav"}
//! {"type":"leave","user":"alice"}
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::SessionEvent;
use crate::stt::{RecognitionError, Utterance};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(String),

    #[error("unrecognised room event: {0}")]
    InvalidEvent(String),

    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
}

/// One line of the room event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    Join {
        user: String,
    },
    Leave {
        user: String,
    },
    SpeechStarted {
        user: String,
    },
    SpeechStopped {
        user: String,
    },
    Transcript {
        user: String,
        text: String,
        is_final: bool,
        #[serde(default)]
        language: String,
        #[serde(default)]
        start_time: f64,
        #[serde(default)]
        end_time: f64,
    },
    Audio {
        user: String,
        path: PathBuf,
    },
    /// A transcript line that named a user but could not be decoded.
    /// Produced by [`parse_line`], never read from the wire directly.
    #[serde(skip)]
    MalformedTranscript {
        user: String,
        reason: String,
    },
}

impl RoomEvent {
    pub fn user(&self) -> &str {
        match self {
            RoomEvent::Join { user }
            | RoomEvent::Leave { user }
            | RoomEvent::SpeechStarted { user }
            | RoomEvent::SpeechStopped { user }
            | RoomEvent::Transcript { user, .. }
            | RoomEvent::Audio { user, .. }
            | RoomEvent::MalformedTranscript { user, .. } => user,
        }
    }

    /// The session-level event this room event carries, if any.  `Join` and
    /// `Leave` are handled by the room itself.
    pub fn into_session_event(self) -> Option<SessionEvent> {
        match self {
            RoomEvent::Join { .. } | RoomEvent::Leave { .. } => None,
            RoomEvent::SpeechStarted { .. } => Some(SessionEvent::SpeechStarted),
            RoomEvent::SpeechStopped { .. } => Some(SessionEvent::SpeechStopped),
            RoomEvent::Transcript {
                text,
                is_final,
                language,
                start_time,
                end_time,
                ..
            } => Some(SessionEvent::Transcript(Utterance {
                text,
                is_final,
                language,
                start_time,
                end_time,
            })),
            RoomEvent::Audio { path, .. } => Some(SessionEvent::AudioClip(path)),
            RoomEvent::MalformedTranscript { reason, .. } => Some(
                SessionEvent::RecognitionFailed(RecognitionError::Malformed(reason)),
            ),
        }
    }
}

/// Decode one line of the event stream.
///
/// Returns `Ok(None)` for blank and comment lines.  A `transcript` event that
/// names its user but is otherwise undecodable becomes
/// [`RoomEvent::MalformedTranscript`] so the user's turn can be abandoned.
///
/// ```
/// use voice_translator::transport::{parse_line, RoomEvent};
///
/// let event = parse_line(r#"{"type":"join","user":"alice"}"#).unwrap();
/// assert_eq!(event, Some(RoomEvent::Join { user: "alice".into() }));
/// assert_eq!(parse_line("  ").unwrap(), None);
/// ```
pub fn parse_line(line: &str) -> Result<Option<RoomEvent>, TransportError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|e| TransportError::Json(e.to_string()))?;

    match serde_json::from_value::<RoomEvent>(value.clone()) {
        Ok(event) => Ok(Some(event)),
        Err(e) => {
            let is_transcript = value["type"].as_str() == Some("transcript");
            match value["user"].as_str() {
                Some(user) if is_transcript => Ok(Some(RoomEvent::MalformedTranscript {
                    user: user.to_string(),
                    reason: e.to_string(),
                })),
                _ => Err(TransportError::InvalidEvent(e.to_string())),
            }
        }
    }
}
