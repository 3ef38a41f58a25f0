use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for messages table. Immutable once persisted;
/// persistence always happens before any delivery attempt.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MessageModel {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl MessageModel {
    pub fn new(room_id: String, sender_id: String, body: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            room_id,
            sender_id,
            body,
            created_at: Utc::now(),
        }
    }
}
