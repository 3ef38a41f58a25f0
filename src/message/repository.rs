use async_trait::async_trait;
use std::sync::Mutex;
use tracing::{debug, instrument};

use super::models::MessageModel;
use crate::shared::AppError;

/// Trait for message persistence operations (the persistence collaborator).
/// In-room ordering is defined by persistence-assigned timestamps, not by
/// arrival order at the router.
#[async_trait]
pub trait MessageRepository {
    async fn save_message(&self, message: &MessageModel) -> Result<(), AppError>;
    async fn list_for_room(&self, room_id: &str) -> Result<Vec<MessageModel>, AppError>;
}

/// In-memory implementation of MessageRepository for development and testing
pub struct InMemoryMessageRepository {
    messages: Mutex<Vec<MessageModel>>,
}

impl Default for InMemoryMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Total persisted message count (for tests and monitoring)
    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    #[instrument(skip(self, message))]
    async fn save_message(&self, message: &MessageModel) -> Result<(), AppError> {
        let mut messages = self.messages.lock().unwrap();
        messages.push(message.clone());

        debug!(
            message_id = %message.id,
            room_id = %message.room_id,
            "Message persisted"
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_for_room(&self, room_id: &str) -> Result<Vec<MessageModel>, AppError> {
        let messages = self.messages.lock().unwrap();
        let mut history: Vec<MessageModel> = messages
            .iter()
            .filter(|m| m.room_id == room_id)
            .cloned()
            .collect();
        history.sort_by_key(|m| m.created_at);

        debug!(room_id = %room_id, count = history.len(), "Room history read");
        Ok(history)
    }
}
