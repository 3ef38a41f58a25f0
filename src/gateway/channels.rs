use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Live connection/channel primitives: which connections exist and which
/// room channels each one is attached to.
///
/// Attachment is deliberately decoupled from durable room membership.
/// Emitting to a room reaches the set of currently attached connections
/// only; membership is the room registry's concern.
#[async_trait]
pub trait ChannelHub: Send + Sync {
    /// Register a connection's outbound sender under its connection id
    async fn register_connection(&self, connection_id: &str, sender: mpsc::UnboundedSender<String>);

    /// Remove a connection and detach it from every room channel
    async fn drop_connection(&self, connection_id: &str);

    /// Attach a connection to a room channel. Idempotent.
    async fn attach(&self, connection_id: &str, room_id: &str);

    /// Fan a payload out to every connection attached to the room.
    /// Sends to closed connections are silently dropped.
    async fn emit_to_room(&self, room_id: &str, payload: &str);

    async fn is_attached(&self, connection_id: &str, room_id: &str) -> bool;
}

#[derive(Default)]
struct HubState {
    /// connection_id -> outbound sender
    connections: HashMap<String, mpsc::UnboundedSender<String>>,
    /// room_id -> attached connection ids
    rooms: HashMap<String, HashSet<String>>,
    /// connection_id -> rooms it is attached to, for detach-on-drop
    attachments: HashMap<String, HashSet<String>>,
}

/// In-process implementation of ChannelHub
pub struct InMemoryChannelHub {
    state: Arc<RwLock<HubState>>,
}

impl InMemoryChannelHub {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(HubState::default())),
        }
    }
}

impl Default for InMemoryChannelHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelHub for InMemoryChannelHub {
    async fn register_connection(&self, connection_id: &str, sender: mpsc::UnboundedSender<String>) {
        let mut state = self.state.write().await;
        state.connections.insert(connection_id.to_string(), sender);

        debug!(connection_id = %connection_id, "Connection registered with channel hub");
    }

    async fn drop_connection(&self, connection_id: &str) {
        let mut state = self.state.write().await;
        state.connections.remove(connection_id);

        if let Some(rooms) = state.attachments.remove(connection_id) {
            for room_id in rooms {
                if let Some(attached) = state.rooms.get_mut(&room_id) {
                    attached.remove(connection_id);
                }
            }
        }

        debug!(connection_id = %connection_id, "Connection dropped from channel hub");
    }

    async fn attach(&self, connection_id: &str, room_id: &str) {
        let mut state = self.state.write().await;

        if !state.connections.contains_key(connection_id) {
            debug!(
                connection_id = %connection_id,
                room_id = %room_id,
                "Attach for unknown connection ignored"
            );
            return;
        }

        let newly_attached = state
            .rooms
            .entry(room_id.to_string())
            .or_default()
            .insert(connection_id.to_string());
        state
            .attachments
            .entry(connection_id.to_string())
            .or_default()
            .insert(room_id.to_string());

        if newly_attached {
            debug!(
                connection_id = %connection_id,
                room_id = %room_id,
                "Connection attached to room channel"
            );
        }
    }

    async fn emit_to_room(&self, room_id: &str, payload: &str) {
        let state = self.state.read().await;

        let Some(attached) = state.rooms.get(room_id) else {
            debug!(room_id = %room_id, "Emit to room with no attached connections");
            return;
        };

        let mut receivers = 0;
        for connection_id in attached {
            if let Some(sender) = state.connections.get(connection_id) {
                // A closed receiver just means the connection is going away
                if sender.send(payload.to_string()).is_ok() {
                    receivers += 1;
                }
            }
        }

        debug!(room_id = %room_id, receivers, "Room event emitted");
    }

    async fn is_attached(&self, connection_id: &str, room_id: &str) -> bool {
        let state = self.state.read().await;
        state
            .rooms
            .get(room_id)
            .map(|attached| attached.contains(connection_id))
            .unwrap_or(false)
    }
}
