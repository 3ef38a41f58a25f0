use axum::{extract::State, Json};
use tracing::debug;

use super::types::RoomResponse;
use crate::shared::{AppError, AppState};

/// GET /rooms - lists discoverable public rooms
pub async fn list_public_rooms(
    State(app_state): State<AppState>,
) -> Result<Json<Vec<RoomResponse>>, AppError> {
    let rooms = app_state.room_service.list_public().await?;

    debug!(room_count = rooms.len(), "Listing public rooms");

    Ok(Json(rooms.iter().map(RoomResponse::from).collect()))
}
