mod gateway;
mod identity;
mod message;
mod presence;
mod room;
mod shared;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gateway::channels::InMemoryChannelHub;
use identity::TokenConfig;
use message::{repository::InMemoryMessageRepository, router::MessageRouter};
use presence::InMemoryPresenceIndex;
use room::{repository::InMemoryRoomRepository, service::RoomService};
use shared::AppState;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting parley chat server");

    // In-memory collaborators; the repository traits are the seam for
    // swapping in Postgres-backed implementations via sqlx::PgPool
    let presence = Arc::new(InMemoryPresenceIndex::new());
    let channel_hub = Arc::new(InMemoryChannelHub::new());
    let room_repository = Arc::new(InMemoryRoomRepository::new());
    let message_repository = Arc::new(InMemoryMessageRepository::new());

    let room_service = Arc::new(RoomService::new(room_repository));
    let message_router = Arc::new(MessageRouter::new(
        room_service.clone(),
        message_repository.clone(),
        presence.clone(),
        channel_hub.clone(),
    ));

    let app_state = AppState::new(
        presence,
        room_service,
        message_repository,
        message_router,
        channel_hub,
        Arc::new(TokenConfig::new()),
    );

    let app = Router::new()
        .route("/auth/guest", post(identity::handlers::create_guest))
        .route("/rooms", get(room::handlers::list_public_rooms))
        .route("/rooms/:room_id/messages", get(message::handlers::room_history))
        .route("/ws", get(gateway::handler::chat_ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!("Server running on http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}
