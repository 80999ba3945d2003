// WebSocket handlers: handshake validation, per-connection reader loop and
// writer task.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use lobby_shared::{LobbyId, PlayerId};
use serde::Deserialize;
use tokio::sync::mpsc;

use owo_colors::OwoColorize;

use crate::server::connections::{Outbound, Session};
use crate::server::router;
use crate::server::state::AppState;

/// Query parameters a client introduces itself with.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub avatar_id: Option<String>,
    pub lobby_id: Option<String>,
}

/// Validated introduction of a connecting player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Introduction {
    pub player_id: PlayerId,
    pub username: String,
    pub avatar_id: String,
    pub lobby_id: Option<LobbyId>,
}

impl ConnectParams {
    /// `userId` and `username` are required and must be non-empty.
    pub fn introduction(self) -> Option<Introduction> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Some(Introduction {
            player_id: PlayerId(non_empty(self.user_id)?),
            username: non_empty(self.username)?,
            avatar_id: self.avatar_id.unwrap_or_default(),
            lobby_id: non_empty(self.lobby_id).map(LobbyId),
        })
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let Some(intro) = params.introduction() else {
        return (StatusCode::BAD_REQUEST, "Missing required parameters").into_response();
    };

    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    if !state.config.read().await.origin_allowed(origin) {
        tracing::warn!(player_id = %intro.player_id, ?origin, "rejected websocket origin");
        return (StatusCode::FORBIDDEN, "Origin not allowed").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, intro))
}

async fn handle_socket(socket: WebSocket, state: AppState, intro: Introduction) {
    let hello = format!("{} {}", "[CONNECT]".bold().green(), intro.username.bold());
    tracing::info!(%hello, player_id = %intro.player_id);

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    let player_id = intro.player_id.clone();
    let session = Session::new(intro.player_id, intro.username, intro.avatar_id, tx);
    let connection_id = session.connection_id;

    // Frames queued by fan-out are written here so that handlers never wait
    // on a slow socket.
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = sink.send(Message::Text(frame.to_string())).await {
                tracing::debug!(error = %e, "websocket write failed");
                break;
            }
        }
        let _ = sink.close().await;
    });

    router::connect(&state, session, intro.lobby_id).await;

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(txt)) => {
                router::handle_text(&state, &player_id, connection_id, &txt).await
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(%player_id, error = %e, "websocket read failed");
                break;
            }
        }
    }

    router::disconnect(&state, &player_id, connection_id).await;
    writer.abort();

    let bye = format!("{} {}", "[DISCONNECT]".bold().red(), player_id.bold());
    tracing::info!(%bye);
}
