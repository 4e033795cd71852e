//! Turn state machine states and the per-session snapshot.
//!
//! [`TurnState`] is the controller's current phase.  [`SessionSnapshot`] is
//! what a session publishes (over a `watch` channel) after every event, and
//! what it returns when the user disconnects.

// ---------------------------------------------------------------------------
// TurnState
// ---------------------------------------------------------------------------

/// States of one user's speak → translate → synthesize cycle.
///
/// ```text
/// Idle ──speech start──▶ Listening
///      ──final utterance──▶ Translating
///                            ──translation──▶ Speaking
///                                              ──playback done──▶ Idle
/// Translating / Speaking ──speech start──▶ Listening   (stale work cancelled)
/// any state ──turn error──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    /// No turn open.
    #[default]
    Idle,

    /// The user is speaking; waiting for a final utterance.
    Listening,

    /// A translation request is in flight.
    Translating,

    /// The translation is being synthesized and played back.
    Speaking,
}

impl TurnState {
    /// Returns `true` while downstream work is outstanding.
    ///
    /// ```
    /// use voice_translator::pipeline::TurnState;
    ///
    /// assert!(!TurnState::Idle.is_busy());
    /// assert!(!TurnState::Listening.is_busy());
    /// assert!(TurnState::Translating.is_busy());
    /// assert!(TurnState::Speaking.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(self, TurnState::Translating | TurnState::Speaking)
    }

    /// A short label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            TurnState::Idle => "idle",
            TurnState::Listening => "listening",
            TurnState::Translating => "translating",
            TurnState::Speaking => "speaking",
        }
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// TurnStats
// ---------------------------------------------------------------------------

/// Per-session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnStats {
    /// Turns whose translation was played to the end.
    pub completed: u64,
    /// Turns abandoned because of a recognition, translation or synthesis error.
    pub failed: u64,
    /// Turns cut short by a newer speech start or by disconnect.
    pub superseded: u64,
    /// Translation requests issued (greeting included).
    pub translations_requested: u64,
    /// Synthesis calls issued.
    pub speak_calls: u64,
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// Observable state of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: TurnState,
    pub turn: u64,
    pub stats: TurnStats,
    /// Display form of the most recent turn error, if any.
    pub last_error: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
