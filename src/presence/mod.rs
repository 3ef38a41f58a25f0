use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::shared::AppError;

/// Ephemeral user-to-connection mapping: the single source of truth for
/// "is this user online, and on which connection".
///
/// The index is not authoritative about durable identity data. A failure
/// from a store-backed implementation is reported to the caller but must
/// be treated as non-fatal: the connection stays open and online/offline
/// decisions degrade to "assume offline".
#[async_trait]
pub trait PresenceIndex: Send + Sync {
    /// Register a user's active connection. Unconditional overwrite:
    /// a reconnect for the same user supersedes the previous entry.
    async fn register(&self, user_id: &str, connection_id: &str) -> Result<(), AppError>;

    /// Point read of a user's active connection. Absence means offline.
    async fn lookup(&self, user_id: &str) -> Result<Option<String>, AppError>;

    /// Remove a user's entry. Idempotent; absent entry is a no-op.
    async fn unregister(&self, user_id: &str) -> Result<(), AppError>;

    /// Remove a user's entry only if it still names `connection_id`.
    /// Returns whether an entry was removed. Used on disconnect so a
    /// superseded session's teardown cannot evict its successor.
    async fn unregister_connection(
        &self,
        user_id: &str,
        connection_id: &str,
    ) -> Result<bool, AppError>;
}

/// In-memory implementation of PresenceIndex
///
/// One entry per user behind an RwLock; per-key upsert/delete is all the
/// atomicity the one-entry-per-user invariant needs.
pub struct InMemoryPresenceIndex {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryPresenceIndex {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of users currently registered (for monitoring)
    pub async fn online_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for InMemoryPresenceIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceIndex for InMemoryPresenceIndex {
    async fn register(&self, user_id: &str, connection_id: &str) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;
        let previous = entries.insert(user_id.to_string(), connection_id.to_string());

        match previous {
            Some(old_connection) => info!(
                user_id = %user_id,
                connection_id = %connection_id,
                superseded = %old_connection,
                "Presence registered, previous session superseded"
            ),
            None => info!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Presence registered"
            ),
        }

        Ok(())
    }

    async fn lookup(&self, user_id: &str) -> Result<Option<String>, AppError> {
        let entries = self.entries.read().await;
        let connection = entries.get(user_id).cloned();

        debug!(
            user_id = %user_id,
            connection_id = ?connection,
            "Presence lookup"
        );

        Ok(connection)
    }

    async fn unregister(&self, user_id: &str) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;

        if entries.remove(user_id).is_some() {
            info!(user_id = %user_id, "Presence unregistered");
        } else {
            debug!(user_id = %user_id, "Presence unregister for absent entry, no-op");
        }

        Ok(())
    }

    async fn unregister_connection(
        &self,
        user_id: &str,
        connection_id: &str,
    ) -> Result<bool, AppError> {
        let mut entries = self.entries.write().await;

        let owns_entry = entries
            .get(user_id)
            .map(|current| current == connection_id)
            .unwrap_or(false);

        if owns_entry {
            entries.remove(user_id);
            info!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Presence unregistered"
            );
        } else {
            debug!(
                user_id = %user_id,
                connection_id = %connection_id,
                "Presence entry owned by another connection, left intact"
            );
        }

        Ok(owns_entry)
    }
}
