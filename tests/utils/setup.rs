use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use parley::gateway::{ConnectionLifecycle, FrameHandler, GatewayFrameHandler, ServerFrame};
use parley::message::repository::InMemoryMessageRepository;
use parley::message::router::MessageRouter;
use parley::presence::InMemoryPresenceIndex;
use parley::room::repository::InMemoryRoomRepository;
use parley::room::service::RoomService;

use super::mocks::MockChannelHub;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub presence: Arc<InMemoryPresenceIndex>,
    pub hub: Arc<MockChannelHub>,
    pub room_service: Arc<RoomService>,
    pub message_repository: Arc<InMemoryMessageRepository>,
    pub message_router: Arc<MessageRouter>,
}

pub struct TestSetupBuilder;

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(self) -> TestSetup {
        let presence = Arc::new(InMemoryPresenceIndex::new());
        let hub = Arc::new(MockChannelHub::new());
        let room_repository = Arc::new(InMemoryRoomRepository::new());
        let message_repository = Arc::new(InMemoryMessageRepository::new());
        let room_service = Arc::new(RoomService::new(room_repository));
        let message_router = Arc::new(MessageRouter::new(
            room_service.clone(),
            message_repository.clone(),
            presence.clone(),
            hub.clone(),
        ));

        TestSetup {
            presence,
            hub,
            room_service,
            message_repository,
            message_router,
        }
    }
}

/// One simulated client connection driven through the real lifecycle
/// and frame handler
pub struct TestClient {
    pub user_id: String,
    pub connection_id: String,
    lifecycle: ConnectionLifecycle,
    handler: GatewayFrameHandler,
    direct_rx: mpsc::UnboundedReceiver<String>,
}

impl TestClient {
    /// Feed an inbound frame through the gateway dispatch, as if the
    /// client had sent it over the socket
    pub async fn send_frame(&self, raw: &str) {
        self.handler.handle_frame(raw.to_string()).await;
    }

    /// Frames addressed to this client alone (errors, soft failures),
    /// bypassing room channels
    pub fn direct_frames(&mut self) -> Vec<ServerFrame> {
        let mut frames = Vec::new();
        while let Ok(raw) = self.direct_rx.try_recv() {
            frames.push(serde_json::from_str(&raw).expect("direct frame parses"));
        }
        frames
    }

    pub async fn disconnect(&mut self) {
        self.lifecycle.go_offline().await;
    }
}

impl TestSetup {
    /// Connects a user: fresh connection id, lifecycle driven to Online
    /// (presence registered, membership rooms attached)
    pub async fn connect(&self, user_id: &str, display_name: &str) -> TestClient {
        let connection_id = format!("conn-{}", Uuid::new_v4());
        let (tx, rx) = mpsc::unbounded_channel();

        let mut lifecycle = ConnectionLifecycle::new(
            connection_id.clone(),
            user_id.to_string(),
            display_name.to_string(),
            self.presence.clone(),
            self.room_service.clone(),
            self.hub.clone(),
        );
        lifecycle.go_online(tx.clone()).await.expect("go_online");

        let handler = GatewayFrameHandler::new(
            connection_id.clone(),
            user_id.to_string(),
            display_name.to_string(),
            tx,
            self.room_service.clone(),
            self.message_router.clone(),
            self.hub.clone(),
        );

        TestClient {
            user_id: user_id.to_string(),
            connection_id,
            lifecycle,
            handler,
            direct_rx: rx,
        }
    }
}
