use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{models::MessageModel, repository::MessageRepository};
use crate::gateway::channels::ChannelHub;
use crate::gateway::messages::ServerFrame;
use crate::presence::PresenceIndex;
use crate::room::service::RoomService;
use crate::shared::AppError;

/// Routes send requests: persist always, deliver live best-effort.
///
/// A message is never "sent" without being durably recorded first. Live
/// delivery depends on the receiver's presence at send time and is not
/// retried or queued once missed; the persisted history covers it on the
/// receiver's next connect.
pub struct MessageRouter {
    room_service: Arc<RoomService>,
    repository: Arc<dyn MessageRepository + Send + Sync>,
    presence: Arc<dyn PresenceIndex>,
    channel_hub: Arc<dyn ChannelHub>,
}

impl MessageRouter {
    pub fn new(
        room_service: Arc<RoomService>,
        repository: Arc<dyn MessageRepository + Send + Sync>,
        presence: Arc<dyn PresenceIndex>,
        channel_hub: Arc<dyn ChannelHub>,
    ) -> Self {
        Self {
            room_service,
            repository,
            presence,
            channel_hub,
        }
    }

    /// Sends a private message, resolving (or lazily creating) the
    /// two-party room for the unordered sender/receiver pair.
    #[instrument(skip(self, body))]
    pub async fn send_private(
        &self,
        sender_id: &str,
        sender_name: &str,
        receiver_id: &str,
        body: &str,
    ) -> Result<MessageModel, AppError> {
        let room = self
            .room_service
            .find_or_create_private(sender_id, receiver_id)
            .await?;

        // Persist unconditionally, regardless of receiver presence
        let message = MessageModel::new(
            room.id.clone(),
            sender_id.to_string(),
            body.to_string(),
        );
        self.repository.save_message(&message).await?;

        let receiver_connection = self.presence_lookup(receiver_id).await;

        match receiver_connection {
            Some(receiver_conn) => {
                // Attach both ends to the room channel (idempotent), then emit
                self.channel_hub.attach(&receiver_conn, &room.id).await;
                if let Some(sender_conn) = self.presence_lookup(sender_id).await {
                    self.channel_hub.attach(&sender_conn, &room.id).await;
                }

                let frame =
                    ServerFrame::private_message(sender_name.to_string(), body.to_string());
                self.channel_hub.emit_to_room(&room.id, &frame.to_json()).await;

                info!(
                    message_id = %message.id,
                    room_id = %room.id,
                    receiver = %receiver_id,
                    "Private message persisted and delivered live"
                );
            }
            None => {
                debug!(
                    message_id = %message.id,
                    room_id = %room.id,
                    receiver = %receiver_id,
                    "Receiver offline, message persisted without live delivery"
                );
            }
        }

        Ok(message)
    }

    /// Sends a message to a public room by name
    #[instrument(skip(self, body))]
    pub async fn send_to_public_room(
        &self,
        sender_id: &str,
        sender_name: &str,
        room_name: &str,
        body: &str,
    ) -> Result<MessageModel, AppError> {
        let room = self
            .room_service
            .find_public_by_name(room_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("room '{}' not found", room_name)))?;

        let message = MessageModel::new(
            room.id.clone(),
            sender_id.to_string(),
            body.to_string(),
        );
        self.repository.save_message(&message).await?;

        if let Some(sender_conn) = self.presence_lookup(sender_id).await {
            self.channel_hub.attach(&sender_conn, &room.id).await;
        }

        let frame = ServerFrame::public_message(sender_name.to_string(), body.to_string());
        self.channel_hub.emit_to_room(&room.id, &frame.to_json()).await;

        info!(
            message_id = %message.id,
            room_id = %room.id,
            room_name = %room_name,
            "Public room message persisted and emitted"
        );

        Ok(message)
    }

    /// Presence lookup that degrades to "assume offline" when the index
    /// is unreachable. Delivery correctness is best-effort by contract.
    async fn presence_lookup(&self, user_id: &str) -> Option<String> {
        match self.presence.lookup(user_id).await {
            Ok(connection) => connection,
            Err(e) => {
                warn!(
                    user_id = %user_id,
                    error = %e,
                    "Presence lookup failed, treating user as offline"
                );
                None
            }
        }
    }
}
