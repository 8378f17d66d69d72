use crate::domain::Difficulty;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::net::client::spawn_session_serializer;
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

#[derive(Debug, serde::Deserialize)]
pub struct GameInitRequest {
    // Optional caller-chosen id; a random one is generated when absent.
    #[serde(default)]
    game_id: Option<String>,
    // Difficulty tier, 0..=2.
    #[serde(default)]
    difficulty: u8,
}

#[derive(Debug, serde::Serialize)]
struct GameInitResponse {
    // The game id that was created.
    game_id: String,
}

pub async fn create_game_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GameInitRequest>,
) -> impl IntoResponse {
    let Some(difficulty) = Difficulty::from_u8(payload.difficulty) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "difficulty must be 0, 1, or 2".to_string(),
            }),
        )
            .into_response();
    };

    let game_id = match payload.game_id {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => ids::new_game_id(),
    };

    match state
        .session_registry
        .create_session(game_id.clone(), difficulty)
        .await
    {
        Ok(handle) => {
            // Create the serializer so clients can subscribe immediately.
            spawn_session_serializer(&handle);
            (StatusCode::CREATED, Json(GameInitResponse { game_id })).into_response()
        }
        Err(crate::use_cases::SessionError::AlreadyExists) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "game already exists".to_string(),
            }),
        )
            .into_response(),
    }
}
