use serde::{Deserialize, Serialize};

use super::models::RoomModel;

/// Response for room listings and room information
#[derive(Debug, Serialize, Deserialize)]
pub struct RoomResponse {
    pub id: String,
    pub kind: String,
    pub name: Option<String>,
    pub member_count: usize,
}

impl From<&RoomModel> for RoomResponse {
    fn from(room: &RoomModel) -> Self {
        Self {
            id: room.id.clone(),
            kind: room.kind.to_string(),
            name: room.name.clone(),
            member_count: room.member_count(),
        }
    }
}
