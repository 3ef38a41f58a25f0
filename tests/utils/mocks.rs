use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use parley::gateway::{ChannelHub, ServerFrame};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Channel hub that records every frame emitted to each attached
/// connection instead of writing to real sockets
#[derive(Clone)]
pub struct MockChannelHub {
    connections: Arc<RwLock<HashSet<String>>>,
    /// room_id -> attached connection ids
    attachments: Arc<RwLock<HashMap<String, HashSet<String>>>>,
    /// connection_id -> frames delivered to it
    emitted: Arc<RwLock<HashMap<String, Vec<String>>>>,
}

impl MockChannelHub {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashSet::new())),
            attachments: Arc::new(RwLock::new(HashMap::new())),
            emitted: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn frames_for(&self, connection_id: &str) -> Vec<ServerFrame> {
        self.emitted
            .read()
            .await
            .get(connection_id)
            .map(|frames| {
                frames
                    .iter()
                    .map(|raw| serde_json::from_str(raw).expect("recorded frame parses"))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn clear_frames(&self) {
        self.emitted.write().await.clear();
    }
}

#[async_trait]
impl ChannelHub for MockChannelHub {
    async fn register_connection(
        &self,
        connection_id: &str,
        _sender: mpsc::UnboundedSender<String>,
    ) {
        self.connections
            .write()
            .await
            .insert(connection_id.to_string());
    }

    async fn drop_connection(&self, connection_id: &str) {
        self.connections.write().await.remove(connection_id);
        for attached in self.attachments.write().await.values_mut() {
            attached.remove(connection_id);
        }
    }

    async fn attach(&self, connection_id: &str, room_id: &str) {
        if !self.connections.read().await.contains(connection_id) {
            return;
        }
        self.attachments
            .write()
            .await
            .entry(room_id.to_string())
            .or_default()
            .insert(connection_id.to_string());
    }

    async fn emit_to_room(&self, room_id: &str, payload: &str) {
        let attachments = self.attachments.read().await;
        let Some(attached) = attachments.get(room_id) else {
            return;
        };

        let mut emitted = self.emitted.write().await;
        for connection_id in attached {
            emitted
                .entry(connection_id.clone())
                .or_default()
                .push(payload.to_string());
        }
    }

    async fn is_attached(&self, connection_id: &str, room_id: &str) -> bool {
        self.attachments
            .read()
            .await
            .get(room_id)
            .map(|attached| attached.contains(connection_id))
            .unwrap_or(false)
    }
}
