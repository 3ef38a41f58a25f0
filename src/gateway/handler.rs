use async_trait::async_trait;
use axum::{
    extract::{State, WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::channels::ChannelHub;
use super::lifecycle::ConnectionLifecycle;
use super::messages::{ClientFrame, ServerFrame};
use super::socket::{Connection, FrameHandler};
use crate::message::router::MessageRouter;
use crate::room::repository::JoinOutcome;
use crate::room::service::RoomService;
use crate::shared::{AppError, AppState};

/// Dispatches one connection's inbound frames to the room service and
/// message router. Rejected or malformed requests are answered on this
/// connection's own channel and never tear the connection down.
pub struct GatewayFrameHandler {
    connection_id: String,
    user_id: String,
    display_name: String,
    outbound: mpsc::UnboundedSender<String>,
    room_service: Arc<RoomService>,
    message_router: Arc<MessageRouter>,
    channel_hub: Arc<dyn ChannelHub>,
}

impl GatewayFrameHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        connection_id: String,
        user_id: String,
        display_name: String,
        outbound: mpsc::UnboundedSender<String>,
        room_service: Arc<RoomService>,
        message_router: Arc<MessageRouter>,
        channel_hub: Arc<dyn ChannelHub>,
    ) -> Self {
        Self {
            connection_id,
            user_id,
            display_name,
            outbound,
            room_service,
            message_router,
            channel_hub,
        }
    }

    fn reply(&self, frame: ServerFrame) {
        // A closed receiver means the connection is already going away
        let _ = self.outbound.send(frame.to_json());
    }

    async fn handle_create_public_room(&self, name: &str) {
        match self.room_service.create_public(name, &self.user_id).await {
            Ok(room) => {
                self.channel_hub.attach(&self.connection_id, &room.id).await;
                let frame = ServerFrame::room_created(name.to_string());
                self.channel_hub.emit_to_room(&room.id, &frame.to_json()).await;
            }
            Err(e) => {
                debug!(
                    user_id = %self.user_id,
                    room_name = %name,
                    error = %e,
                    "Public room creation rejected"
                );
                self.reply(ServerFrame::error(e.to_string()));
            }
        }
    }

    async fn handle_join_public_room(&self, name: &str) {
        match self.room_service.join_public(name, &self.user_id).await {
            Ok(JoinOutcome::Added(room)) => {
                self.channel_hub.attach(&self.connection_id, &room.id).await;
                let frame = ServerFrame::user_joined(self.display_name.clone());
                self.channel_hub.emit_to_room(&room.id, &frame.to_json()).await;
            }
            Ok(JoinOutcome::AlreadyMember) => {
                // Soft failure: notify the client, keep the channel attached
                if let Ok(Some(room)) = self.room_service.find_public_by_name(name).await {
                    self.channel_hub.attach(&self.connection_id, &room.id).await;
                }
                self.reply(ServerFrame::not_joined("already a member".to_string()));
            }
            Ok(JoinOutcome::RoomNotFound) => {
                self.reply(ServerFrame::not_joined("room no longer exists".to_string()));
            }
            Err(e) => {
                debug!(
                    user_id = %self.user_id,
                    room_name = %name,
                    error = %e,
                    "Join rejected"
                );
                self.reply(ServerFrame::error(e.to_string()));
            }
        }
    }

    async fn handle_private_message(&self, receiver: &str, body: &str) {
        let result = self
            .message_router
            .send_private(&self.user_id, &self.display_name, receiver, body)
            .await;

        if let Err(e) = result {
            warn!(
                user_id = %self.user_id,
                receiver = %receiver,
                error = %e,
                "Private message rejected"
            );
            self.reply(ServerFrame::error(e.to_string()));
        }
    }

    async fn handle_public_message(&self, room_name: &str, body: &str) {
        let result = self
            .message_router
            .send_to_public_room(&self.user_id, &self.display_name, room_name, body)
            .await;

        if let Err(e) = result {
            warn!(
                user_id = %self.user_id,
                room_name = %room_name,
                error = %e,
                "Public message rejected"
            );
            self.reply(ServerFrame::error(e.to_string()));
        }
    }
}

#[async_trait]
impl FrameHandler for GatewayFrameHandler {
    async fn handle_frame(&self, raw: String) {
        debug!(
            user_id = %self.user_id,
            connection_id = %self.connection_id,
            frame = %raw,
            "Received frame"
        );

        match serde_json::from_str::<ClientFrame>(&raw) {
            Ok(ClientFrame::CreatePublicRoom { name }) => {
                self.handle_create_public_room(&name).await
            }
            Ok(ClientFrame::JoinPublicRoom { name }) => self.handle_join_public_room(&name).await,
            Ok(ClientFrame::PrivateMessage { receiver, message }) => {
                self.handle_private_message(&receiver, &message).await
            }
            Ok(ClientFrame::PublicMessage { room, message }) => {
                self.handle_public_message(&room, &message).await
            }
            Err(e) => {
                warn!(
                    user_id = %self.user_id,
                    connection_id = %self.connection_id,
                    error = %e,
                    "Failed to parse client frame"
                );
                self.reply(ServerFrame::error("malformed frame".to_string()));
            }
        }
    }
}

/// WebSocket endpoint that authenticates via the Sec-WebSocket-Protocol
/// header before upgrading. GET /ws with an identity token in the header.
pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(app_state): State<AppState>,
) -> Result<Response, AppError> {
    let token = headers
        .get("sec-websocket-protocol")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing or invalid Sec-WebSocket-Protocol header");
            AppError::Unauthorized("Missing authentication token".to_string())
        })?;

    let claims = app_state.identity.validate_token(token)?;

    info!(
        user_id = %claims.sub,
        display_name = %claims.name,
        "WebSocket authentication successful"
    );

    // Echo the offered subprotocol; browsers abort the handshake when the
    // server's response does not select one of the protocols they sent
    let protocol = token.to_string();
    Ok(ws.protocols([protocol]).on_upgrade(move |socket| {
        handle_chat_connection(socket, claims.sub, claims.name, app_state)
    }))
}

/// Handle the upgraded WebSocket connection through its full lifecycle
async fn handle_chat_connection(
    socket: axum::extract::ws::WebSocket,
    user_id: String,
    display_name: String,
    app_state: AppState,
) {
    let connection_id = Uuid::new_v4().to_string();

    info!(
        user_id = %user_id,
        connection_id = %connection_id,
        "WebSocket connection established"
    );

    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();

    let mut lifecycle = ConnectionLifecycle::new(
        connection_id.clone(),
        user_id.clone(),
        display_name.clone(),
        app_state.presence.clone(),
        app_state.room_service.clone(),
        app_state.channel_hub.clone(),
    );

    // Presence registration and membership replay; failures degrade but
    // never abort the connection
    if let Err(e) = lifecycle.go_online(outbound_sender.clone()).await {
        warn!(
            user_id = %user_id,
            connection_id = %connection_id,
            error = %e,
            "Lifecycle transition reported an error, continuing"
        );
    }

    let frame_handler = Arc::new(GatewayFrameHandler::new(
        connection_id.clone(),
        user_id.clone(),
        display_name,
        outbound_sender,
        app_state.room_service.clone(),
        app_state.message_router.clone(),
        app_state.channel_hub.clone(),
    ));

    let connection = Connection::new(
        connection_id.clone(),
        Box::new(socket),
        outbound_receiver,
        frame_handler,
    );

    match connection.run().await {
        Ok(()) => {
            info!(
                user_id = %user_id,
                connection_id = %connection_id,
                "WebSocket connection closed cleanly"
            );
        }
        Err(e) => {
            warn!(
                user_id = %user_id,
                connection_id = %connection_id,
                error = ?e,
                "WebSocket connection error"
            );
        }
    }

    lifecycle.go_offline().await;
}
