//! Errors raised by lobby operations.
//!
//! Every variant is local to the message that caused it: the router turns it
//! into an `error` envelope for the sender and keeps the connection open.

use lobby_shared::ServerMsg;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LobbyError {
    #[error("Lobby not found")]
    LobbyNotFound,

    #[error("Lobby is full")]
    LobbyFull,

    #[error("Player not found")]
    PlayerNotFound,

    #[error("Max players must be between {min} and {max}, got {got}")]
    InvalidConfig { got: i64, min: usize, max: usize },

    /// A non-host tried a host-only action.
    #[error("Only host can {action}")]
    Unauthorized { action: &'static str },

    #[error("All players must be ready to start")]
    NotAllReady,

    #[error("Malformed message: {0}")]
    MalformedPayload(String),
}

impl LobbyError {
    pub fn to_server_msg(&self) -> ServerMsg {
        ServerMsg::error(self.to_string())
    }
}

pub type LobbyResult<T> = Result<T, LobbyError>;
