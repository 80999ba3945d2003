// HTTP handlers for the lobby server API.
//
// Read-only views of the registry for lobby browsers and tooling. All
// mutations go through the websocket router.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::server::router::lobby_summaries;
use crate::server::AppState;
use lobby_shared::{LobbyId, ServerMsg};

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let lobbies = state.registry.len().await;
    let connections = state.connections.len().await;
    Json(serde_json::json!({ "ok": true, "lobbies": lobbies, "connections": connections }))
}

/// All lobbies, oldest first.
pub async fn lobbies_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(lobby_summaries(&state).await.lobbies)
}

pub async fn lobby_handler(
    State(state): State<AppState>,
    Path(lobby_id): Path<String>,
) -> impl IntoResponse {
    match state.registry.get(&LobbyId(lobby_id)).await {
        Some(lobby) => (StatusCode::OK, Json(lobby.state_payload())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ServerMsg::error(crate::error::LobbyError::LobbyNotFound.to_string())),
        )
            .into_response(),
    }
}
