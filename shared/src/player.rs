//! Player and lobby identifiers plus the public player view sent to clients.

use serde::{Deserialize, Serialize};

/// Identifier a client introduces itself with (`userId` query parameter).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl From<&str> for PlayerId {
    fn from(v: &str) -> Self {
        PlayerId(v.to_owned())
    }
}

impl From<String> for PlayerId {
    fn from(v: String) -> Self {
        PlayerId(v)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque lobby identifier allocated by the server.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct LobbyId(pub String);

impl From<&str> for LobbyId {
    fn from(v: &str) -> Self {
        LobbyId(v.to_owned())
    }
}

impl From<String> for LobbyId {
    fn from(v: String) -> Self {
        LobbyId(v)
    }
}

impl std::fmt::Display for LobbyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public view of a lobby member
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub username: String,
    #[serde(default)]
    pub avatar_id: String,
    pub ready: bool,
    pub is_host: bool,
}
