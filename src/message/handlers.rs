use axum::{
    extract::{Path, State},
    Json,
};
use tracing::debug;

use super::models::MessageModel;
use crate::shared::{AppError, AppState};

/// GET /rooms/{room_id}/messages - history read, used by clients to
/// backfill messages missed while offline
pub async fn room_history(
    State(app_state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<MessageModel>>, AppError> {
    let room = app_state
        .room_service
        .get_room(&room_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("room '{}' not found", room_id)))?;

    let history = app_state.message_repository.list_for_room(&room.id).await?;

    debug!(room_id = %room.id, count = history.len(), "Room history served");

    Ok(Json(history))
}
