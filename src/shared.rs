use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::gateway::channels::ChannelHub;
use crate::identity::TokenConfig;
use crate::message::{repository::MessageRepository, router::MessageRouter};
use crate::presence::PresenceIndex;
use crate::room::service::RoomService;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub presence: Arc<dyn PresenceIndex>,
    pub room_service: Arc<RoomService>,
    pub message_repository: Arc<dyn MessageRepository + Send + Sync>,
    pub message_router: Arc<MessageRouter>,
    pub channel_hub: Arc<dyn ChannelHub>,
    pub identity: Arc<TokenConfig>,
}

impl AppState {
    pub fn new(
        presence: Arc<dyn PresenceIndex>,
        room_service: Arc<RoomService>,
        message_repository: Arc<dyn MessageRepository + Send + Sync>,
        message_router: Arc<MessageRouter>,
        channel_hub: Arc<dyn ChannelHub>,
        identity: Arc<TokenConfig>,
    ) -> Self {
        Self {
            presence,
            room_service,
            message_repository,
            message_router,
            channel_hub,
            identity,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::JwtError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::CollaboratorUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
