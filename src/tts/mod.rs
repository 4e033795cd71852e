//! Speech synthesis: text → audio → user.
//!
//! * [`Synthesizer`]: async trait turning translated text into PCM audio.
//! * [`CartesiaSynthesizer`]: hosted `/tts/bytes` client.
//! * [`AudioSink`]: delivers audio; `play` returning is playback-complete.
//! * [`FileSink`]: writes one PCM file per turn.

pub mod sink;
pub mod synthesizer;

pub use sink::{AudioSink, FileSink, PlaybackTarget};
pub use synthesizer::{CartesiaSynthesizer, SpeechAudio, SynthesisError, Synthesizer};
