//! Usage accounting for the hosted collaborators.
//!
//! [`UsageCollector`] is shared (`Arc`) by every client and session in the
//! process.  Counters are plain atomics so recording never blocks a session
//! task.  [`UsageCollector::summary`] takes a point-in-time snapshot that
//! `main` logs on shutdown.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Token counts reported by an OpenAI-compatible `usage` object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Outcome of one turn, as counted by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Translation was spoken to the end.
    Completed,
    /// The turn ended in a recoverable error.
    Failed,
    /// A newer turn replaced it before it finished.
    Superseded,
}

/// Process-wide usage counters.
#[derive(Debug, Default)]
pub struct UsageCollector {
    llm_requests: AtomicU64,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    tts_characters: AtomicU64,
    stt_audio_ms: AtomicU64,
    turns_completed: AtomicU64,
    turns_failed: AtomicU64,
    turns_superseded: AtomicU64,
}

impl UsageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one chat-completions call and the tokens it reported, if any.
    pub fn record_llm(&self, usage: Option<TokenUsage>) {
        self.llm_requests.fetch_add(1, Ordering::Relaxed);
        if let Some(usage) = usage {
            self.prompt_tokens
                .fetch_add(usage.prompt_tokens, Ordering::Relaxed);
            self.completion_tokens
                .fetch_add(usage.completion_tokens, Ordering::Relaxed);
        }
    }

    /// Record text sent to the synthesizer.
    pub fn record_tts(&self, text: &str) {
        self.tts_characters
            .fetch_add(text.chars().count() as u64, Ordering::Relaxed);
    }

    /// Record audio sent to the recognizer.
    pub fn record_stt(&self, audio_ms: u64) {
        self.stt_audio_ms.fetch_add(audio_ms, Ordering::Relaxed);
    }

    pub fn record_turn(&self, outcome: TurnOutcome) {
        let counter = match outcome {
            TurnOutcome::Completed => &self.turns_completed,
            TurnOutcome::Failed => &self.turns_failed,
            TurnOutcome::Superseded => &self.turns_superseded,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of every counter.
    pub fn summary(&self) -> UsageSummary {
        UsageSummary {
            llm_requests: self.llm_requests.load(Ordering::Relaxed),
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
            tts_characters: self.tts_characters.load(Ordering::Relaxed),
            stt_audio_ms: self.stt_audio_ms.load(Ordering::Relaxed),
            turns_completed: self.turns_completed.load(Ordering::Relaxed),
            turns_failed: self.turns_failed.load(Ordering::Relaxed),
            turns_superseded: self.turns_superseded.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the [`UsageCollector`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageSummary {
    pub llm_requests: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub tts_characters: u64,
    pub stt_audio_ms: u64,
    pub turns_completed: u64,
    pub turns_failed: u64,
    pub turns_superseded: u64,
}

impl fmt::Display for UsageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "llm_requests={} prompt_tokens={} completion_tokens={} tts_characters={} \
             stt_audio_secs={:.1} turns_completed={} turns_failed={} turns_superseded={}",
            self.llm_requests,
            self.prompt_tokens,
            self.completion_tokens,
            self.tts_characters,
            self.stt_audio_ms as f64 / 1000.0,
            self.turns_completed,
            self.turns_failed,
            self.turns_superseded,
        )
    }
}
