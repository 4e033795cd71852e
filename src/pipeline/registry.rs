//! Per-room session registry.
//!
//! One [`SessionWorker`] task per participant.  Sessions share the
//! [`Collaborators`] and the usage collector but no mutable state, so a slow
//! translation for one user never delays another.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::metrics::UsageCollector;

use super::session::{Collaborators, SessionEvent, SessionSettings, SessionWorker};
use super::state::SessionSnapshot;

struct SessionHandle {
    events: mpsc::Sender<SessionEvent>,
    task: JoinHandle<SessionSnapshot>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

pub struct SessionRegistry {
    room: String,
    collab: Collaborators,
    settings: SessionSettings,
    usage: Arc<UsageCollector>,
    sessions: HashMap<String, SessionHandle>,
}

impl SessionRegistry {
    pub fn new(
        room: impl Into<String>,
        collab: Collaborators,
        settings: SessionSettings,
        usage: Arc<UsageCollector>,
    ) -> Self {
        Self {
            room: room.into(),
            collab,
            settings,
            usage,
            sessions: HashMap::new(),
        }
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    /// Start a session for `user`.  Returns `false` if one is already running.
    pub fn join(&mut self, user: &str) -> bool {
        if self.sessions.contains_key(user) {
            log::warn!("[{}/{user}] already joined; ignoring", self.room);
            return false;
        }

        let worker = SessionWorker::new(
            self.room.clone(),
            user,
            self.collab.clone(),
            &self.settings,
            Some(Arc::clone(&self.usage)),
        );
        let snapshot = worker.snapshot();
        let (events, rx) = mpsc::channel(self.settings.event_buffer);
        let task = tokio::spawn(worker.run(rx));

        log::info!("[{}/{user}] participant joined", self.room);
        self.sessions.insert(
            user.to_string(),
            SessionHandle {
                events,
                task,
                snapshot,
            },
        );
        true
    }

    /// Stop `user`'s session and wait for it to wind down.
    pub async fn leave(&mut self, user: &str) -> Option<SessionSnapshot> {
        let Some(handle) = self.sessions.remove(user) else {
            log::warn!("[{}/{user}] leave for unknown participant", self.room);
            return None;
        };
        let snapshot = self.finish(user, handle).await;
        Some(snapshot)
    }

    /// Deliver `event` to `user`'s session.  Events for users who never
    /// joined are dropped.
    pub async fn dispatch(&self, user: &str, event: SessionEvent) {
        let Some(handle) = self.sessions.get(user) else {
            log::warn!("[{}/{user}] event for unknown participant dropped", self.room);
            return;
        };
        if handle.events.send(event).await.is_err() {
            log::warn!("[{}/{user}] session is gone; event dropped", self.room);
        }
    }

    /// Stop every session.
    pub async fn shutdown(&mut self) {
        let sessions: Vec<_> = self.sessions.drain().collect();
        for (user, handle) in sessions {
            self.finish(&user, handle).await;
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, user: &str) -> bool {
        self.sessions.contains_key(user)
    }

    /// Latest published state of `user`'s session.
    pub fn snapshot(&self, user: &str) -> Option<SessionSnapshot> {
        self.sessions.get(user).map(|h| h.snapshot.borrow().clone())
    }

    /// Subscribe to `user`'s session state.
    pub fn watch(&self, user: &str) -> Option<watch::Receiver<SessionSnapshot>> {
        self.sessions.get(user).map(|h| h.snapshot.clone())
    }

    async fn finish(&self, user: &str, handle: SessionHandle) -> SessionSnapshot {
        let SessionHandle { events, task, snapshot } = handle;
        drop(events);
        let last = match task.await {
            Ok(last) => last,
            Err(e) => {
                log::error!("[{}/{user}] session task failed: {e}", self.room);
                snapshot.borrow().clone()
            }
        };
        log::info!(
            "[{}/{user}] participant left after {} turns ({} completed, {} failed, {} superseded)",
            self.room,
            last.turn,
            last.stats.completed,
            last.stats.failed,
            last.stats.superseded
        );
        last
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
