//! TCP room server: every accepted connection is its own room.

use std::future::Future;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::metrics::UsageCollector;
use crate::pipeline::{Collaborators, SessionRegistry, SessionSettings};

use super::event::TransportError;
use super::room::Room;

/// Everything a new room needs.
#[derive(Clone)]
pub struct RoomFactory {
    pub collab: Collaborators,
    pub settings: SessionSettings,
    pub usage: Arc<UsageCollector>,
}

impl RoomFactory {
    pub fn room(&self, name: impl Into<String>) -> Room {
        Room::new(SessionRegistry::new(
            name,
            self.collab.clone(),
            self.settings.clone(),
            Arc::clone(&self.usage),
        ))
    }
}

/// Bind `addr` for [`serve`].
pub async fn bind(addr: &str) -> Result<TcpListener, TransportError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| TransportError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Accept connections until `shutdown` resolves, then close every open room
/// and wait for their sessions to end.
pub async fn serve<F>(
    listener: TcpListener,
    factory: RoomFactory,
    shutdown: F,
) -> Result<(), TransportError>
where
    F: Future<Output = ()>,
{
    if let Ok(addr) = listener.local_addr() {
        log::info!("listening for rooms on {addr}");
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut rooms = JoinSet::new();
    let mut next_room = 0u64;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        log::warn!("accept failed: {e}");
                        continue;
                    }
                };
                next_room += 1;
                let mut room = factory.room(format!("room-{next_room}"));
                let mut stop = stop_rx.clone();
                log::info!("[{}] connection from {peer}", room.name());

                rooms.spawn(async move {
                    let stopped = async move {
                        let _ = stop.wait_for(|s| *s).await;
                    };
                    if let Err(e) = room.run(BufReader::new(stream), stopped).await {
                        log::warn!("[{}] room ended with error: {e}", room.name());
                    }
                });
            }
            Some(done) = rooms.join_next(), if !rooms.is_empty() => {
                if let Err(e) = done {
                    log::error!("room task failed: {e}");
                }
            }
        }
    }

    let _ = stop_tx.send(true);
    while let Some(done) = rooms.join_next().await {
        if let Err(e) = done {
            log::error!("room task failed: {e}");
        }
    }
    Ok(())
}
