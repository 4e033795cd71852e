//! Translation turn controller: the per-user state machine.
//!
//! [`TurnController`] performs no I/O.  Every input (speech start, utterance,
//! translation result, playback completion) updates the state and returns the
//! [`Action`]s the hosting session must carry out.  Work handed out through
//! an action carries a fresh [`RequestId`]; a completion whose id is no longer
//! the one in flight is stale and is dropped, which is how "latest turn wins"
//! holds even when cancellation of the stale task comes too late.

use std::sync::Arc;

use thiserror::Error;

use crate::llm::{LlmError, TranslationRequest, TranslationResult};
use crate::metrics::{TurnOutcome, UsageCollector};
use crate::stt::{RecognitionError, Utterance};
use crate::tts::SynthesisError;

use super::state::{SessionSnapshot, TurnState, TurnStats};

/// Identity of one speaker turn.  Increases with every speech start.
pub type TurnId = u64;

/// Identity of one downstream submission (translation, greeting or speech).
pub type RequestId = u64;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a translation produced nothing speakable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranslationError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("translator returned empty text")]
    EmptyTranslation,
}

/// Recoverable failures that abandon a turn.  They are only ever logged; the
/// user hears silence and may speak again.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("recognition failed: {0}")]
    Recognition(#[from] RecognitionError),

    #[error("translation failed: {0}")]
    Translation(#[from] TranslationError),

    #[error("synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// Side effects requested by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send `request` to the translator; report back with the same id.
    Translate {
        id: RequestId,
        request: TranslationRequest,
    },
    /// Ask the translator for the session greeting; report back as a
    /// translation result with the same id.
    Greet { id: RequestId },
    /// Synthesize `text` and play it; report playback completion with the id.
    Speak { id: RequestId, text: String },
    /// Best-effort abort of the work started under `id`.
    Cancel { id: RequestId },
}

// ---------------------------------------------------------------------------
// TurnController
// ---------------------------------------------------------------------------

pub struct TurnController {
    log_prefix: String,
    target_language: String,
    state: TurnState,
    turn: TurnId,
    next_request: RequestId,
    in_flight: Option<RequestId>,
    /// Last final utterance accepted in the current turn (duplicate guard).
    last_final: Option<Utterance>,
    stats: TurnStats,
    last_error: Option<TurnError>,
    usage: Option<Arc<UsageCollector>>,
}

impl TurnController {
    /// Create a controller.
    ///
    /// * `log_prefix`: prepended to every log line (e.g. `"[lobby/alice]"`).
    /// * `target_language`: language tag put on every translation request.
    pub fn new(log_prefix: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            log_prefix: log_prefix.into(),
            target_language: target_language.into(),
            state: TurnState::Idle,
            turn: 0,
            next_request: 0,
            in_flight: None,
            last_final: None,
            stats: TurnStats::default(),
            last_error: None,
            usage: None,
        }
    }

    /// Count turn outcomes in the process-wide collector as well.
    pub fn with_usage(mut self, usage: Arc<UsageCollector>) -> Self {
        self.usage = Some(usage);
        self
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn turn(&self) -> TurnId {
        self.turn
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight
    }

    pub fn stats(&self) -> TurnStats {
        self.stats
    }

    pub fn last_error(&self) -> Option<&TurnError> {
        self.last_error.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            turn: self.turn,
            stats: self.stats,
            last_error: self.last_error.as_ref().map(|e| e.to_string()),
        }
    }

    // -----------------------------------------------------------------------
    // Inputs
    // -----------------------------------------------------------------------

    /// The user joined.  With `greeting` set, the self-introduction runs as
    /// a synthetic turn so that the user's first words cancel it.
    pub fn on_session_started(&mut self, greeting: bool) -> Vec<Action> {
        log::info!("{} session started", self.log_prefix);
        if !greeting {
            return Vec::new();
        }

        self.turn += 1;
        let id = self.next_id();
        self.in_flight = Some(id);
        self.stats.translations_requested += 1;
        self.set_state(TurnState::Translating);
        vec![Action::Greet { id }]
    }

    /// Voice activity started: open a new turn, cancelling any stale work.
    pub fn on_speech_started(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();

        if let Some(id) = self.in_flight.take() {
            log::info!(
                "{} turn {} superseded while {}; cancelling request {id}",
                self.log_prefix,
                self.turn,
                self.state
            );
            actions.push(Action::Cancel { id });
            self.record_outcome(TurnOutcome::Superseded);
        }

        self.turn += 1;
        self.last_final = None;
        self.set_state(TurnState::Listening);
        actions
    }

    /// Voice activity stopped.  The turn stays open until a final utterance.
    pub fn on_speech_stopped(&mut self) -> Vec<Action> {
        log::debug!("{} speech stopped (turn {})", self.log_prefix, self.turn);
        Vec::new()
    }

    /// A recognizer event for the current turn.
    pub fn on_utterance(&mut self, utterance: Utterance) -> Vec<Action> {
        if !utterance.is_final {
            log::debug!(
                "{} transcript received (partial): {}",
                self.log_prefix,
                utterance.text
            );
            return Vec::new();
        }

        if !utterance.has_valid_span() {
            return self.fail_turn(TurnError::Recognition(RecognitionError::Malformed(format!(
                "invalid time span {}..{}",
                utterance.start_time, utterance.end_time
            ))));
        }

        if utterance.is_blank() {
            log::warn!(
                "{} empty final utterance dropped (turn {})",
                self.log_prefix,
                self.turn
            );
            if self.state == TurnState::Listening {
                self.set_state(TurnState::Idle);
            }
            return Vec::new();
        }

        if self.state == TurnState::Idle {
            // Final transcript without a preceding speech start.
            self.turn += 1;
            self.last_final = None;
            log::debug!("{} opening turn {} on final utterance", self.log_prefix, self.turn);
        }

        if self.last_final.as_ref() == Some(&utterance) {
            log::debug!(
                "{} duplicate final utterance ignored (turn {})",
                self.log_prefix,
                self.turn
            );
            return Vec::new();
        }

        log::info!(
            "{} user speech committed: {}",
            self.log_prefix,
            utterance.text
        );

        let mut actions = Vec::new();
        if let Some(stale) = self.in_flight.take() {
            log::debug!(
                "{} newer utterance supersedes request {stale}",
                self.log_prefix
            );
            actions.push(Action::Cancel { id: stale });
        }

        let id = self.next_id();
        let request = TranslationRequest {
            source_text: utterance.text.trim().to_string(),
            target_language: self.target_language.clone(),
        };
        self.in_flight = Some(id);
        self.last_final = Some(utterance);
        self.stats.translations_requested += 1;
        self.set_state(TurnState::Translating);
        actions.push(Action::Translate { id, request });
        actions
    }

    /// An audio clip submitted during `turn` has been transcribed.
    pub fn on_clip_transcribed(
        &mut self,
        turn: TurnId,
        result: Result<Utterance, RecognitionError>,
    ) -> Vec<Action> {
        if turn != self.turn {
            log::debug!(
                "{} discarding transcription for stale turn {turn}",
                self.log_prefix
            );
            return Vec::new();
        }
        match result {
            Ok(utterance) => self.on_utterance(utterance),
            Err(e) => self.on_recognition_failed(e),
        }
    }

    /// The recognizer failed or delivered something unusable.
    pub fn on_recognition_failed(&mut self, error: RecognitionError) -> Vec<Action> {
        self.fail_turn(TurnError::Recognition(error))
    }

    /// The translator answered request `id`.
    pub fn on_translation_result(
        &mut self,
        id: RequestId,
        result: Result<TranslationResult, LlmError>,
    ) -> Vec<Action> {
        if self.state != TurnState::Translating || self.in_flight != Some(id) {
            log::debug!("{} discarding stale translation {id}", self.log_prefix);
            return Vec::new();
        }
        self.in_flight = None;

        let text = match result {
            Ok(result) => result.translated_text.trim().to_string(),
            Err(e) => return self.fail_turn(TranslationError::Llm(e).into()),
        };
        if text.is_empty() {
            return self.fail_turn(TranslationError::EmptyTranslation.into());
        }

        log::info!("{} translation: {text}", self.log_prefix);

        let speak_id = self.next_id();
        self.in_flight = Some(speak_id);
        self.stats.speak_calls += 1;
        self.set_state(TurnState::Speaking);
        vec![Action::Speak { id: speak_id, text }]
    }

    /// Playback of speech `id` finished (or failed).
    pub fn on_playback_complete(
        &mut self,
        id: RequestId,
        result: Result<(), SynthesisError>,
    ) -> Vec<Action> {
        if self.state != TurnState::Speaking || self.in_flight != Some(id) {
            log::debug!("{} discarding stale playback {id}", self.log_prefix);
            return Vec::new();
        }
        self.in_flight = None;

        match result {
            Ok(()) => {
                self.complete_turn();
                Vec::new()
            }
            Err(e) => self.fail_turn(e.into()),
        }
    }

    /// The user disconnected: cancel whatever is outstanding.
    pub fn on_session_ended(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if let Some(id) = self.in_flight.take() {
            actions.push(Action::Cancel { id });
            self.record_outcome(TurnOutcome::Superseded);
        }
        self.set_state(TurnState::Idle);
        log::debug!(
            "{} session ended: {} completed, {} failed, {} superseded",
            self.log_prefix,
            self.stats.completed,
            self.stats.failed,
            self.stats.superseded
        );
        actions
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn next_id(&mut self) -> RequestId {
        self.next_request += 1;
        self.next_request
    }

    fn set_state(&mut self, state: TurnState) {
        if self.state != state {
            log::debug!("{} {} -> {}", self.log_prefix, self.state, state);
            self.state = state;
        }
    }

    fn complete_turn(&mut self) {
        self.last_final = None;
        self.record_outcome(TurnOutcome::Completed);
        log::info!("{} turn {} complete", self.log_prefix, self.turn);
        self.set_state(TurnState::Idle);
    }

    fn fail_turn(&mut self, error: TurnError) -> Vec<Action> {
        let mut actions = Vec::new();
        if let Some(id) = self.in_flight.take() {
            actions.push(Action::Cancel { id });
        }
        log::error!("{} turn {} abandoned: {error}", self.log_prefix, self.turn);
        self.last_final = None;
        self.last_error = Some(error);
        self.record_outcome(TurnOutcome::Failed);
        self.set_state(TurnState::Idle);
        actions
    }

    fn record_outcome(&mut self, outcome: TurnOutcome) {
        match outcome {
            TurnOutcome::Completed => self.stats.completed += 1,
            TurnOutcome::Failed => self.stats.failed += 1,
            TurnOutcome::Superseded => self.stats.superseded += 1,
        }
        if let Some(usage) = &self.usage {
            usage.record_turn(outcome);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
