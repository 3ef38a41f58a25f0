use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::shared::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct GuestRequest {
    pub display_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GuestResponse {
    pub user_id: String,
    pub token: String,
}

/// POST /auth/guest - issues an identity token for a fresh user id
pub async fn create_guest(
    State(app_state): State<AppState>,
    Json(request): Json<GuestRequest>,
) -> Result<Json<GuestResponse>, AppError> {
    let user_id = Uuid::new_v4().to_string();
    let token = app_state
        .identity
        .create_token(user_id.clone(), request.display_name.clone())?;

    info!(
        user_id = %user_id,
        display_name = %request.display_name,
        "Guest identity issued"
    );

    Ok(Json(GuestResponse { user_id, token }))
}
