//! Turn-based Chinese-to-English voice translation.
//!
//! Room events (speech start/stop, transcripts, audio clips) drive one
//! [`pipeline::TurnController`] per participant.  Each final utterance is
//! translated by a language model and spoken back with a hosted speech
//! synthesizer; a new speech start always wins over work still in flight.

pub mod cli;
pub mod config;
pub mod llm;
pub mod metrics;
pub mod pipeline;
pub mod stt;
pub mod transport;
pub mod tts;
