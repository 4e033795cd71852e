//! Speech recognition: utterance type and the recognizer seam.
//!
//! # Architecture
//!
//! ```text
//! room transcript event ──────────────────────────────┐
//!                                                     ▼
//! room audio-clip event ─▶ Recognizer::transcribe ─▶ Utterance ─▶ TurnController
//!                          (CartesiaRecognizer)
//! ```
//!
//! Streaming recognition happens upstream of this crate: partial and final
//! transcripts arrive as room events.  [`Recognizer`] covers rooms that
//! deliver recorded clips instead.

pub mod recognizer;
pub mod utterance;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use recognizer::{AudioClip, CartesiaRecognizer, RecognitionError, Recognizer};
pub use utterance::Utterance;

#[cfg(test)]
pub use recognizer::MockRecognizer;
