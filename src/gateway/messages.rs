use serde::{Deserialize, Serialize};

/// Frames the client sends over the chat socket.
/// Event names are part of the wire contract and must not change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ClientFrame {
    #[serde(rename = "createNewPublicRoom")]
    CreatePublicRoom { name: String },

    #[serde(rename = "join_pub_room")]
    JoinPublicRoom { name: String },

    #[serde(rename = "msg_priv_to_server")]
    PrivateMessage { receiver: String, message: String },

    #[serde(rename = "msg_pub_to_server")]
    PublicMessage { room: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomCreatedData {
    pub room: String,
}

/// Frames the server emits to attached channels or a single client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ServerFrame {
    /// Broadcast to the new room's own channel after creation
    #[serde(rename = "createNewPublicRoom")]
    RoomCreated {
        status: String,
        message: String,
        data: RoomCreatedData,
    },

    /// Broadcast to a public room when a user joins
    #[serde(rename = "user_joined_pub_room")]
    UserJoined { name: String, text: String },

    /// Delivered on a private room's channel only when the receiver is online
    #[serde(rename = "msg_priv_to_client")]
    PrivateMessage { name: String, text: String },

    #[serde(rename = "msg_pub_to_client")]
    PublicMessage { name: String, text: String },

    /// Soft join failure, sent to the requesting client only
    #[serde(rename = "not_joined")]
    NotJoined { reason: String },

    /// Rejected or malformed request, sent to the offending client only
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerFrame {
    pub fn room_created(room_name: String) -> Self {
        Self::RoomCreated {
            status: "success".to_string(),
            message: "new room created".to_string(),
            data: RoomCreatedData { room: room_name },
        }
    }

    pub fn user_joined(display_name: String) -> Self {
        Self::UserJoined {
            name: display_name,
            text: "new user joined".to_string(),
        }
    }

    pub fn private_message(sender_name: String, body: String) -> Self {
        Self::PrivateMessage {
            name: sender_name,
            text: body,
        }
    }

    pub fn public_message(sender_name: String, body: String) -> Self {
        Self::PublicMessage {
            name: sender_name,
            text: body,
        }
    }

    pub fn not_joined(reason: String) -> Self {
        Self::NotJoined { reason }
    }

    pub fn error(message: String) -> Self {
        Self::Error { message }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap()
    }
}
