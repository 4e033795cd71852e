//! A room: one stream of room events feeding one [`SessionRegistry`].

use std::future::Future;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::pipeline::SessionRegistry;

use super::event::{parse_line, RoomEvent, TransportError};

pub struct Room {
    registry: SessionRegistry,
}

impl Room {
    pub fn new(registry: SessionRegistry) -> Self {
        Self { registry }
    }

    pub fn name(&self) -> &str {
        self.registry.room()
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Read events from `reader` until EOF or until `shutdown` resolves, then
    /// end every session in the room.
    ///
    /// Undecodable lines are logged and skipped; only a read error ends the
    /// room with an error.
    pub async fn run<R, F>(&mut self, reader: R, shutdown: F) -> Result<(), TransportError>
    where
        R: AsyncBufRead + Unpin,
        F: Future<Output = ()>,
    {
        log::info!("[{}] room opened", self.name());
        let mut lines = reader.lines();
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("[{}] shutdown requested", self.name());
                    break Ok(());
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => self.handle_line(&line).await,
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(TransportError::Io(e)),
                },
            }
        };

        self.registry.shutdown().await;
        log::info!("[{}] room closed", self.name());
        result
    }

    async fn handle_line(&mut self, line: &str) {
        match parse_line(line) {
            Ok(Some(event)) => self.handle(event).await,
            Ok(None) => {}
            Err(e) => log::warn!("[{}] skipping event: {e}", self.name()),
        }
    }

    /// Apply one event to the room.
    pub async fn handle(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::Join { user } => {
                self.registry.join(&user);
            }
            RoomEvent::Leave { user } => {
                self.registry.leave(&user).await;
            }
            other => {
                let user = other.user().to_string();
                if let Some(event) = other.into_session_event() {
                    self.registry.dispatch(&user, event).await;
                }
            }
        }
    }
}
