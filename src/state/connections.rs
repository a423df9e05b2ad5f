//! Connection registry: live transports, the identity each is bound to, and per-game
//! connection sets.
//!
//! The registry never owns game data. Dropping a connection only removes it here; the game
//! keeps its team or admin state and merely loses the transport reference.

use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, RwLock};

use crate::protocol::ServerMessage;
use crate::types::*;

#[derive(Debug)]
pub struct ClientConnection {
    pub id: ConnectionId,
    tx: mpsc::Sender<ServerMessage>,
    pub identity: Option<Identity>,
}

impl ClientConnection {
    /// Whether the writer side of the transport is still draining messages
    pub fn is_live(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queue a message without waiting. A full or closed queue drops it for this peer only.
    fn deliver(&self, msg: ServerMessage) -> bool {
        let event = msg.event();
        match self.tx.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, event, "outbound queue full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(conn_id = %self.id, event, "connection closed, dropping message");
                false
            }
        }
    }
}

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ClientConnection>>,
    game_connections: RwLock<HashMap<GameId, HashSet<ConnectionId>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new transport and return its id
    pub async fn register(&self, tx: mpsc::Sender<ServerMessage>) -> ConnectionId {
        let id = ulid::Ulid::new().to_string();
        let connection = ClientConnection {
            id: id.clone(),
            tx,
            identity: None,
        };
        self.connections.write().await.insert(id.clone(), connection);
        tracing::info!(conn_id = %id, "connection registered");
        id
    }

    /// Remove a transport. Returns the identity it was bound to, if any.
    pub async fn unregister(&self, id: &str) -> Option<Identity> {
        let removed = self.connections.write().await.remove(id)?;
        if let Some(identity) = &removed.identity {
            self.leave_game(identity.game_id(), id).await;
        }
        tracing::info!(conn_id = %id, identity = ?removed.identity, "connection unregistered");
        removed.identity
    }

    /// Bind a connection to an identity, moving it between game sets if needed
    pub async fn bind(&self, id: &str, identity: Identity) -> bool {
        let previous = {
            let mut connections = self.connections.write().await;
            let Some(connection) = connections.get_mut(id) else {
                return false;
            };
            connection.identity.replace(identity.clone())
        };

        if let Some(previous) = previous {
            if previous.game_id() != identity.game_id() {
                self.leave_game(previous.game_id(), id).await;
            }
        }
        self.game_connections
            .write()
            .await
            .entry(identity.game_id().to_string())
            .or_default()
            .insert(id.to_string());

        tracing::info!(conn_id = %id, identity = ?identity, "connection bound");
        true
    }

    async fn leave_game(&self, game_id: &str, id: &str) {
        let mut games = self.game_connections.write().await;
        if let Some(set) = games.get_mut(game_id) {
            set.remove(id);
            if set.is_empty() {
                games.remove(game_id);
            }
        }
    }

    pub async fn identity(&self, id: &str) -> Option<Identity> {
        self.connections
            .read()
            .await
            .get(id)
            .and_then(|c| c.identity.clone())
    }

    pub async fn is_live(&self, id: &str) -> bool {
        self.connections
            .read()
            .await
            .get(id)
            .map(|c| c.is_live())
            .unwrap_or(false)
    }

    /// Queue a message for one connection
    pub async fn send(&self, id: &str, msg: ServerMessage) -> bool {
        match self.connections.read().await.get(id) {
            Some(connection) => connection.deliver(msg),
            None => false,
        }
    }

    /// Queue a per-recipient message for every connection in a game. `shape` decides what each
    /// identity receives; `None` skips that connection.
    pub async fn fan_out<F>(&self, game_id: &str, mut shape: F) -> usize
    where
        F: FnMut(&str, &Identity) -> Option<ServerMessage>,
    {
        let ids: Vec<ConnectionId> = match self.game_connections.read().await.get(game_id) {
            Some(set) => set.iter().cloned().collect(),
            None => return 0,
        };
        let connections = self.connections.read().await;
        let mut delivered = 0;
        for id in ids {
            let Some(connection) = connections.get(&id) else {
                continue;
            };
            let Some(identity) = &connection.identity else {
                continue;
            };
            if let Some(msg) = shape(&id, identity) {
                if connection.deliver(msg) {
                    delivered += 1;
                }
            }
        }
        tracing::debug!(game_id, delivered, "fan-out complete");
        delivered
    }

    /// Same message to every connection in a game
    pub async fn broadcast(&self, game_id: &str, msg: ServerMessage) -> usize {
        self.fan_out(game_id, |_, _| Some(msg.clone())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (mpsc::Sender<ServerMessage>, mpsc::Receiver<ServerMessage>) {
        mpsc::channel(8)
    }

    fn team(game_id: &str, team_id: &str) -> Identity {
        Identity::Team {
            game_id: game_id.to_string(),
            team_id: team_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_bind_unregister() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();
        let id = registry.register(tx).await;
        assert_eq!(registry.identity(&id).await, None);
        assert!(registry.is_live(&id).await);

        assert!(registry.bind(&id, team("g1", "t1")).await);
        assert_eq!(registry.broadcast("g1", ServerMessage::success("x")).await, 1);

        assert_eq!(registry.unregister(&id).await, Some(team("g1", "t1")));
        assert_eq!(registry.broadcast("g1", ServerMessage::success("x")).await, 0);
        assert!(!registry.is_live(&id).await);
        assert!(!registry.bind(&id, team("g1", "t1")).await);
    }

    #[tokio::test]
    async fn test_rebind_moves_between_games() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();
        let id = registry.register(tx).await;

        registry.bind(&id, team("g1", "t1")).await;
        registry
            .bind(
                &id,
                Identity::Admin {
                    game_id: "g2".to_string(),
                },
            )
            .await;

        assert_eq!(registry.broadcast("g1", ServerMessage::success("x")).await, 0);
        assert_eq!(registry.broadcast("g2", ServerMessage::success("x")).await, 1);
    }

    #[tokio::test]
    async fn test_broadcast_scoped_to_game() {
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();
        let (tx3, mut rx3) = channel();
        let a = registry.register(tx1).await;
        let b = registry.register(tx2).await;
        let _unbound = registry.register(tx3).await;
        registry.bind(&a, team("g1", "t1")).await;
        registry.bind(&b, team("g2", "t2")).await;

        let sent = registry
            .broadcast("g1", ServerMessage::success("hello"))
            .await;
        assert_eq!(sent, 1);
        assert_eq!(rx1.try_recv().unwrap(), ServerMessage::success("hello"));
        assert!(rx2.try_recv().is_err());
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_queue_does_not_block_others() {
        let registry = ConnectionRegistry::new();
        let (slow_tx, _slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = channel();
        let slow = registry.register(slow_tx).await;
        let fast = registry.register(fast_tx).await;
        registry.bind(&slow, team("g1", "t1")).await;
        registry.bind(&fast, team("g1", "t2")).await;

        registry.broadcast("g1", ServerMessage::success("one")).await;
        let sent = registry.broadcast("g1", ServerMessage::success("two")).await;
        assert_eq!(sent, 1);

        assert_eq!(fast_rx.try_recv().unwrap(), ServerMessage::success("one"));
        assert_eq!(fast_rx.try_recv().unwrap(), ServerMessage::success("two"));
    }

    #[tokio::test]
    async fn test_closed_receiver_is_not_live() {
        let registry = ConnectionRegistry::new();
        let (tx, rx) = channel();
        let id = registry.register(tx).await;
        drop(rx);
        assert!(!registry.is_live(&id).await);
        assert!(!registry.send(&id, ServerMessage::success("x")).await);
    }
}
