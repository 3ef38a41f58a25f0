use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Discriminates named group rooms from implicit two-party rooms
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "room_kind", rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RoomKind {
    Public,
    Private,
}

/// Builds the canonical key for a private room from the unordered
/// participant pair, so `(a, b)` and `(b, a)` resolve identically.
pub fn pair_key(user_a: &str, user_b: &str) -> String {
    if user_a <= user_b {
        format!("{}:{}", user_a, user_b)
    } else {
        format!("{}:{}", user_b, user_a)
    }
}

/// Database model for rooms table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RoomModel {
    pub id: String,
    pub kind: RoomKind,
    /// Globally unique among public rooms; absent for private rooms
    pub name: Option<String>,
    /// Unordered participant pair key; absent for public rooms
    pub pair_key: Option<String>,
    pub member_ids: Vec<String>,
}

impl RoomModel {
    /// Creates a new public room with the creator as its first member
    pub fn new_public(name: String, creator_id: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: RoomKind::Public,
            name: Some(name),
            pair_key: None,
            member_ids: vec![creator_id],
        }
    }

    /// Creates a new private room for the unordered pair of participants.
    /// Participants are fixed at creation and never change.
    pub fn new_private(user_a: String, user_b: String) -> Self {
        let key = pair_key(&user_a, &user_b);
        Self {
            id: Uuid::new_v4().to_string(),
            kind: RoomKind::Private,
            name: None,
            pair_key: Some(key),
            member_ids: vec![user_a, user_b],
        }
    }

    pub fn has_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|m| m == user_id)
    }

    pub fn member_count(&self) -> usize {
        self.member_ids.len()
    }
}
