//! Client-server messaging protocol for the lobby.
//!
//! Every frame is a JSON envelope `{ "type": "...", "payload": ... }`. Outbound
//! messages map one-to-one onto [`ServerMsg`] variants. Inbound frames are
//! decoded in two steps (envelope first, then the payload for the named kind)
//! so that unknown kinds can be told apart from malformed payloads.

use serde::{Deserialize, Serialize};

use crate::player::{LobbyId, PlayerId, PlayerInfo};

/// Raw frame as it travels over the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateLobbyPayload {
    pub game_name: String,
    pub max_players: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinLobbyPayload {
    pub lobby_id: LobbyId,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReorderPlayersPayload {
    pub player_order: Vec<PlayerId>,
}

/// Messages that clients can send to the server
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMsg {
    CreateLobby(CreateLobbyPayload),
    JoinLobby(JoinLobbyPayload),
    LeaveLobby,
    ToggleReady,
    StartGame,
    ReorderPlayers(ReorderPlayersPayload),
    ListLobbies,
}

/// Failure to turn an inbound frame into a [`ClientMsg`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid message envelope: {0}")]
    Envelope(String),
    #[error("invalid {kind} payload: {reason}")]
    Payload { kind: String, reason: String },
}

impl ClientMsg {
    /// Decode a text frame. `Ok(None)` means the envelope was well formed but
    /// named a kind this server does not know.
    pub fn decode(text: &str) -> Result<Option<ClientMsg>, DecodeError> {
        let envelope: Envelope =
            serde_json::from_str(text).map_err(|e| DecodeError::Envelope(e.to_string()))?;
        Self::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: Envelope) -> Result<Option<ClientMsg>, DecodeError> {
        fn payload<T: serde::de::DeserializeOwned>(
            kind: &str,
            value: serde_json::Value,
        ) -> Result<T, DecodeError> {
            serde_json::from_value(value).map_err(|e| DecodeError::Payload {
                kind: kind.to_owned(),
                reason: e.to_string(),
            })
        }

        let Envelope { kind, payload: body } = envelope;
        let msg = match kind.as_str() {
            "create_lobby" => ClientMsg::CreateLobby(payload(&kind, body)?),
            "join_lobby" => ClientMsg::JoinLobby(payload(&kind, body)?),
            "reorder_players" => ClientMsg::ReorderPlayers(payload(&kind, body)?),
            // Payload-less kinds: whatever the client put in `payload` is ignored.
            "leave_lobby" => ClientMsg::LeaveLobby,
            "toggle_ready" => ClientMsg::ToggleReady,
            "start_game" => ClientMsg::StartGame,
            "list_lobbies" => ClientMsg::ListLobbies,
            _ => return Ok(None),
        };
        Ok(Some(msg))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ClientMsg::CreateLobby(_) => "create_lobby",
            ClientMsg::JoinLobby(_) => "join_lobby",
            ClientMsg::LeaveLobby => "leave_lobby",
            ClientMsg::ToggleReady => "toggle_ready",
            ClientMsg::StartGame => "start_game",
            ClientMsg::ReorderPlayers(_) => "reorder_players",
            ClientMsg::ListLobbies => "list_lobbies",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LobbyCreatedPayload {
    pub lobby_id: LobbyId,
    pub game_name: String,
    pub max_players: usize,
    pub is_host: bool,
}

/// Complete public view of one lobby
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LobbyStatePayload {
    pub lobby_id: LobbyId,
    pub game_name: String,
    pub max_players: usize,
    pub host_id: PlayerId,
    pub players: Vec<PlayerInfo>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LobbyListPayload {
    pub lobbies: Vec<LobbyStatePayload>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoinedPayload {
    pub user_id: PlayerId,
    pub username: String,
    pub avatar_id: String,
    pub is_host: bool,
    pub ready: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeftPayload {
    pub user_id: PlayerId,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HostChangedPayload {
    pub new_host_id: PlayerId,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReadyChangedPayload {
    pub user_id: PlayerId,
    pub ready: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameStartingPayload {
    pub lobby_id: LobbyId,
    pub game_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LobbyClosedPayload {
    pub lobby_id: LobbyId,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub message: String,
}

/// Messages that the server can send to clients
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMsg {
    LobbyCreated(LobbyCreatedPayload),
    LobbyState(LobbyStatePayload),
    LobbyList(LobbyListPayload),
    LobbyClosed(LobbyClosedPayload),
    PlayerJoined(PlayerJoinedPayload),
    PlayerLeft(PlayerLeftPayload),
    HostChanged(HostChangedPayload),
    PlayerReadyChanged(ReadyChangedPayload),
    GameStarting(GameStartingPayload),
    PlayersReordered(ReorderPlayersPayload),
    Error(ErrorPayload),
}

impl ServerMsg {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMsg::Error(ErrorPayload {
            message: message.into(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ServerMsg::LobbyCreated(_) => "lobby_created",
            ServerMsg::LobbyState(_) => "lobby_state",
            ServerMsg::LobbyList(_) => "lobby_list",
            ServerMsg::LobbyClosed(_) => "lobby_closed",
            ServerMsg::PlayerJoined(_) => "player_joined",
            ServerMsg::PlayerLeft(_) => "player_left",
            ServerMsg::HostChanged(_) => "host_changed",
            ServerMsg::PlayerReadyChanged(_) => "player_ready_changed",
            ServerMsg::GameStarting(_) => "game_starting",
            ServerMsg::PlayersReordered(_) => "players_reordered",
            ServerMsg::Error(_) => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_payload_kinds() {
        let msg = ClientMsg::decode(
            r#"{"type":"create_lobby","payload":{"gameName":"Poker","maxPlayers":4}}"#,
        )
        .expect("valid frame");
        assert_eq!(
            msg,
            Some(ClientMsg::CreateLobby(CreateLobbyPayload {
                game_name: "Poker".into(),
                max_players: 4,
            }))
        );
    }

    #[test]
    fn payload_less_kinds_ignore_payload() {
        assert_eq!(
            ClientMsg::decode(r#"{"type":"toggle_ready","payload":{}}"#),
            Ok(Some(ClientMsg::ToggleReady))
        );
        assert_eq!(
            ClientMsg::decode(r#"{"type":"leave_lobby"}"#),
            Ok(Some(ClientMsg::LeaveLobby))
        );
    }

    #[test]
    fn unknown_kind_is_not_an_error() {
        assert_eq!(
            ClientMsg::decode(r#"{"type":"dance","payload":{"moves":3}}"#),
            Ok(None)
        );
    }

    #[test]
    fn malformed_payload_names_the_kind() {
        let err = ClientMsg::decode(r#"{"type":"join_lobby","payload":{"lobby":"x"}}"#)
            .expect_err("missing lobbyId");
        assert!(matches!(err, DecodeError::Payload { ref kind, .. } if kind == "join_lobby"));
        assert!(err.to_string().starts_with("invalid join_lobby payload: "));

        let err = ClientMsg::decode("not json").expect_err("not an envelope");
        assert!(matches!(err, DecodeError::Envelope(_)));
        assert!(err.to_string().starts_with("invalid message envelope: "));
    }

    #[test]
    fn client_msg_serializes_as_envelope() {
        let txt = serde_json::to_string(&ClientMsg::JoinLobby(JoinLobbyPayload {
            lobby_id: LobbyId::from("abc"),
        }))
        .unwrap();
        assert_eq!(txt, r#"{"type":"join_lobby","payload":{"lobbyId":"abc"}}"#);
        let back = ClientMsg::decode(&txt).unwrap();
        assert!(matches!(back, Some(ClientMsg::JoinLobby(_))));
    }

    #[test]
    fn server_msg_wire_shape() {
        let msg = ServerMsg::PlayerReadyChanged(ReadyChangedPayload {
            user_id: PlayerId::from("b"),
            ready: true,
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "player_ready_changed",
                "payload": { "userId": "b", "ready": true }
            })
        );
        assert_eq!(value["type"], msg.kind());
    }
}
