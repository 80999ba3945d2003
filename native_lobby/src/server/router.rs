//! Message router: turns inbound client messages into registry calls and
//! fan-out.
//!
//! The router keeps no state of its own. Every handler runs on the task that
//! read the message, mutates the registry first and only then touches the
//! connection table and fan-out, which keeps the registry -> connections lock
//! order.

use std::io::IsTerminal;

use lobby_shared::{
    ClientMsg, CreateLobbyPayload, GameStartingPayload, HostChangedPayload, JoinLobbyPayload,
    LobbyClosedPayload, LobbyCreatedPayload, LobbyId, LobbyListPayload, PlayerId,
    PlayerJoinedPayload, PlayerLeftPayload, ReadyChangedPayload, ReorderPlayersPayload, ServerMsg,
};
use uuid::Uuid;

use super::connections::Session;
use super::fanout;
use super::registry::{self, Lobby, Player};
use super::state::AppState;
use crate::error::{LobbyError, LobbyResult};
use crate::pretty;

/// Decode a text frame read from connection `connection_id` of `player_id`
/// and dispatch it.
pub async fn handle_text(state: &AppState, player_id: &PlayerId, connection_id: Uuid, text: &str) {
    match ClientMsg::decode(text) {
        Ok(Some(msg)) => handle_client_msg(state, player_id, connection_id, msg).await,
        Ok(None) => {
            tracing::debug!(%player_id, raw_in = %text, "ignoring unknown message kind");
        }
        Err(e) => {
            tracing::warn!(%player_id, error = %e, "failed to decode client message");
            if state.connections.is_current(player_id, connection_id).await {
                let err = LobbyError::MalformedPayload(e.to_string());
                fanout::unicast(&state.connections, player_id, &err.to_server_msg()).await;
            }
        }
    }
}

/// Dispatch one decoded message. Errors go back to the sender only.
///
/// Frames from a connection that has since been replaced by a newer socket
/// of the same player are dropped.
pub async fn handle_client_msg(
    state: &AppState,
    player_id: &PlayerId,
    connection_id: Uuid,
    msg: ClientMsg,
) {
    let kind = msg.kind();
    tracing::debug!(%player_id, kind, "client message");

    let Some(session) = state.connections.get(player_id).await else {
        tracing::debug!(%player_id, kind, "message from unregistered session");
        return;
    };
    if session.connection_id != connection_id {
        tracing::debug!(%player_id, %connection_id, kind, "message from replaced connection");
        return;
    }

    let result = match msg {
        ClientMsg::CreateLobby(p) => create_lobby(state, &session, p).await,
        ClientMsg::JoinLobby(p) => join_lobby(state, &session, p).await,
        ClientMsg::LeaveLobby => leave_current(state, &session).await,
        ClientMsg::ToggleReady => toggle_ready(state, &session).await,
        ClientMsg::StartGame => start_game(state, &session).await,
        ClientMsg::ReorderPlayers(p) => reorder_players(state, &session, p).await,
        ClientMsg::ListLobbies => list_lobbies(state, &session).await,
    };

    if let Err(e) = result {
        tracing::info!(%player_id, kind, error = %e, "request rejected");
        fanout::unicast(&state.connections, player_id, &e.to_server_msg()).await;
    }
}

/// Register a freshly connected session and, if the client asked for one,
/// put it (back) into a lobby.
///
/// A session replacing an older socket of the same player keeps that
/// socket's lobby membership.
pub async fn connect(state: &AppState, session: Session, lobby_id: Option<LobbyId>) {
    let player_id = session.player_id.clone();
    let connection_id = session.connection_id;
    if let Some(old) = state.connections.register(session).await {
        tracing::info!(
            %player_id,
            old_connection = %old.connection_id,
            lobby_id = ?old.current_lobby,
            "replaced existing connection"
        );
    }

    if let Some(lobby_id) = lobby_id {
        let msg = ClientMsg::JoinLobby(JoinLobbyPayload { lobby_id });
        handle_client_msg(state, &player_id, connection_id, msg).await;
    }
}

/// Tear down a closed connection: implicit leave, then unregister.
///
/// Does nothing if the player has already reconnected on a newer socket.
pub async fn disconnect(state: &AppState, player_id: &PlayerId, connection_id: Uuid) {
    let Some(session) = state.connections.unregister(player_id, connection_id).await else {
        tracing::debug!(%player_id, %connection_id, "stale connection closed");
        return;
    };
    if let Some(lobby_id) = &session.current_lobby {
        if let Err(e) = leave_lobby(state, player_id, lobby_id).await {
            tracing::debug!(%player_id, %lobby_id, error = %e, "implicit leave skipped");
        }
    }
}

fn player_from(session: &Session) -> Player {
    Player::new(
        session.player_id.clone(),
        session.username.clone(),
        session.avatar_id.clone(),
    )
}

fn log_lobby(lobby: &Lobby) {
    let line = pretty::format_lobby_human(lobby, std::io::stdout().is_terminal());
    tracing::info!("{}", line);
}

async fn create_lobby(state: &AppState, session: &Session, p: CreateLobbyPayload) -> LobbyResult<()> {
    registry::validate_max_players(p.max_players)?;
    // Creating while already in a lobby moves the player rather than
    // leaving a dangling membership behind.
    leave_current(state, session).await?;

    let host = player_from(session).with_ready(true);
    let lobby = state
        .registry
        .create_and_join(host, &p.game_name, p.max_players)
        .await?;
    tracing::info!(lobby_id = %lobby.id, player_id = %session.player_id, "lobby created");
    log_lobby(&lobby);

    state
        .connections
        .set_lobby(&session.player_id, Some(lobby.id.clone()))
        .await;
    state.connections.set_ready(&session.player_id, true).await;

    let created = ServerMsg::LobbyCreated(LobbyCreatedPayload {
        lobby_id: lobby.id.clone(),
        game_name: lobby.game_name.clone(),
        max_players: lobby.max_players,
        is_host: true,
    });
    fanout::unicast(&state.connections, &session.player_id, &created).await;
    fanout::broadcast_all(&state.connections, &ServerMsg::LobbyState(lobby.state_payload())).await;
    Ok(())
}

async fn join_lobby(state: &AppState, session: &Session, p: JoinLobbyPayload) -> LobbyResult<()> {
    let target = p.lobby_id;
    let player_id = &session.player_id;
    let outcome = state.registry.join(&target, player_from(session)).await?;

    if let Some(previous) = session.current_lobby.as_ref().filter(|l| **l != target) {
        if let Err(e) = leave_lobby(state, player_id, previous).await {
            tracing::debug!(%player_id, lobby_id = %previous, error = %e, "previous lobby already gone");
        }
    }

    state
        .connections
        .set_lobby(player_id, Some(target.clone()))
        .await;
    state.connections.set_ready(player_id, outcome.ready).await;

    if outcome.rejoined {
        tracing::info!(%player_id, lobby_id = %target, ready = outcome.ready, "player rejoined lobby");
    } else {
        tracing::info!(%player_id, lobby_id = %target, "player joined lobby");
        let joined = ServerMsg::PlayerJoined(PlayerJoinedPayload {
            user_id: player_id.clone(),
            username: session.username.clone(),
            avatar_id: session.avatar_id.clone(),
            is_host: outcome.is_host,
            ready: outcome.ready,
        });
        fanout::to_lobby(&state.connections, &target, &joined).await;
    }

    match state.registry.get(&target).await {
        Some(lobby) => {
            log_lobby(&lobby);
            let msg = ServerMsg::LobbyState(lobby.state_payload());
            fanout::unicast(&state.connections, player_id, &msg).await;
            Ok(())
        }
        // Everyone (including us) left between the join and the snapshot.
        None => Err(LobbyError::LobbyNotFound),
    }
}

/// Leave the session's current lobby, if any.
async fn leave_current(state: &AppState, session: &Session) -> LobbyResult<()> {
    let Some(lobby_id) = &session.current_lobby else {
        return Ok(());
    };
    match leave_lobby(state, &session.player_id, lobby_id).await {
        // A membership the registry no longer knows about is just cleared.
        Err(LobbyError::LobbyNotFound | LobbyError::PlayerNotFound) => {
            state.connections.set_lobby(&session.player_id, None).await;
            Ok(())
        }
        other => other,
    }
}

/// Remove `player_id` from `lobby_id` and notify the lobby.
///
/// The leaver is still attached while the notifications go out, so it sees
/// its own `player_left` as an acknowledgement.
async fn leave_lobby(state: &AppState, player_id: &PlayerId, lobby_id: &LobbyId) -> LobbyResult<()> {
    let outcome = state.registry.leave(lobby_id, player_id).await?;
    tracing::info!(%player_id, %lobby_id, closed = outcome.closed, "player left lobby");

    if let Some(new_host_id) = outcome.new_host {
        tracing::info!(%lobby_id, %new_host_id, "host changed");
        let msg = ServerMsg::HostChanged(HostChangedPayload { new_host_id });
        fanout::to_lobby(&state.connections, lobby_id, &msg).await;
    }

    let left = ServerMsg::PlayerLeft(PlayerLeftPayload {
        user_id: player_id.clone(),
    });
    fanout::to_lobby(&state.connections, lobby_id, &left).await;
    state.connections.set_lobby(player_id, None).await;

    if outcome.closed {
        tracing::info!(%lobby_id, "lobby closed");
        state.connections.clear_lobby(lobby_id).await;
        let closed = ServerMsg::LobbyClosed(LobbyClosedPayload {
            lobby_id: lobby_id.clone(),
        });
        fanout::broadcast_all(&state.connections, &closed).await;
    }
    Ok(())
}

/// Resolve the session's lobby through the registry. A lobby that no longer
/// exists detaches the session and yields `None`.
async fn current_lobby(state: &AppState, session: &Session) -> Option<Lobby> {
    let lobby_id = session.current_lobby.as_ref()?;
    let lobby = state.registry.get(lobby_id).await;
    if lobby.is_none() {
        tracing::debug!(player_id = %session.player_id, %lobby_id, "session pointed at a closed lobby");
        state.connections.set_lobby(&session.player_id, None).await;
    }
    lobby
}

async fn toggle_ready(state: &AppState, session: &Session) -> LobbyResult<()> {
    let Some(lobby_id) = &session.current_lobby else {
        return Ok(());
    };
    let player_id = &session.player_id;
    let ready = match state.registry.toggle_ready(lobby_id, player_id).await {
        Ok(ready) => ready,
        Err(LobbyError::LobbyNotFound | LobbyError::PlayerNotFound) => {
            state.connections.set_lobby(player_id, None).await;
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    state.connections.set_ready(player_id, ready).await;

    let msg = ServerMsg::PlayerReadyChanged(ReadyChangedPayload {
        user_id: player_id.clone(),
        ready,
    });
    fanout::to_lobby(&state.connections, lobby_id, &msg).await;
    Ok(())
}

async fn start_game(state: &AppState, session: &Session) -> LobbyResult<()> {
    let Some(lobby_id) = &session.current_lobby else {
        return Ok(());
    };
    let lobby = match state.registry.can_start(lobby_id, &session.player_id).await {
        Ok(lobby) => lobby,
        Err(LobbyError::LobbyNotFound) => {
            tracing::debug!(player_id = %session.player_id, %lobby_id, "session pointed at a closed lobby");
            state.connections.set_lobby(&session.player_id, None).await;
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    tracing::info!(lobby_id = %lobby.id, game_id = %lobby.game_id, "game starting");
    let msg = ServerMsg::GameStarting(GameStartingPayload {
        lobby_id: lobby.id.clone(),
        game_id: lobby.game_id.clone(),
    });
    fanout::to_lobby(&state.connections, &lobby.id, &msg).await;
    Ok(())
}

/// Relay a host-submitted seating order. The order is advisory and not
/// checked against the member list.
async fn reorder_players(
    state: &AppState,
    session: &Session,
    p: ReorderPlayersPayload,
) -> LobbyResult<()> {
    let Some(lobby) = current_lobby(state, session).await else {
        return Ok(());
    };
    if !lobby.is_host(&session.player_id) {
        return Err(LobbyError::Unauthorized {
            action: "reorder players",
        });
    }
    fanout::to_lobby(&state.connections, &lobby.id, &ServerMsg::PlayersReordered(p)).await;
    Ok(())
}

/// Lobby summaries ordered by creation time.
pub async fn lobby_summaries(state: &AppState) -> LobbyListPayload {
    let mut lobbies = state.registry.list().await;
    lobbies.sort_by_key(|l| l.created_at);
    LobbyListPayload {
        lobbies: lobbies.iter().map(Lobby::state_payload).collect(),
    }
}

async fn list_lobbies(state: &AppState, session: &Session) -> LobbyResult<()> {
    let msg = ServerMsg::LobbyList(lobby_summaries(state).await);
    fanout::unicast(&state.connections, &session.player_id, &msg).await;
    Ok(())
}
