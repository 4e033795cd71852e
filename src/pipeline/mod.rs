//! Turn pipeline for the voice translator.
//!
//! Each participant in a room gets a [`SessionWorker`] task driving a
//! [`TurnController`]:
//!
//! ```text
//! RoomEvent ─▶ SessionRegistry ─▶ SessionWorker (one task per user)
//!                                     │
//!                                     ├─ speech start   → Listening (cancel stale work)
//!                                     ├─ final utterance → Translator::translate   [Translating]
//!                                     ├─ translation     → Synthesizer + AudioSink [Speaking]
//!                                     └─ playback done   → Idle
//! ```
//!
//! Only the most recent turn ever reaches the synthesizer: every request
//! carries a [`RequestId`] and late results for superseded requests are
//! discarded.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voice_translator::metrics::UsageCollector;
//! use voice_translator::pipeline::{Collaborators, SessionEvent, SessionRegistry, SessionSettings};
//!
//! # async fn example(collab: Collaborators) {
//! let mut registry = SessionRegistry::new(
//!     "lobby",
//!     collab,
//!     SessionSettings::default(),
//!     Arc::new(UsageCollector::new()),
//! );
//! registry.join("alice");
//! registry.dispatch("alice", SessionEvent::SpeechStarted).await;
//! registry.shutdown().await;
//! # }
//! ```

pub mod controller;
pub mod registry;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use controller::{Action, RequestId, TranslationError, TurnController, TurnError, TurnId};
pub use registry::SessionRegistry;
pub use session::{Collaborators, SessionEvent, SessionSettings, SessionWorker};
pub use state::{SessionSnapshot, TurnState, TurnStats};
