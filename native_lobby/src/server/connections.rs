//! Connection table: live sessions keyed by player id.
//!
//! A session only references its lobby by id and must re-resolve it through
//! the registry. The table has its own lock, distinct from the registry's;
//! callers must never hold a guard from this table while calling into the
//! registry (lock order is registry first, then connections).

use std::collections::HashMap;
use std::sync::Arc;

use lobby_shared::{LobbyId, PlayerId};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Serialized frame queued for a connection's writer task.
pub type Outbound = Arc<str>;

/// Runtime identity of one live connection.
#[derive(Clone, Debug)]
pub struct Session {
    pub player_id: PlayerId,
    pub username: String,
    pub avatar_id: String,
    /// Distinguishes sockets of the same player when a client reconnects
    /// before its previous socket has been torn down.
    pub connection_id: Uuid,
    pub current_lobby: Option<LobbyId>,
    /// Mirror of the registry's ready flag for this player.
    pub ready: bool,
    sender: mpsc::UnboundedSender<Outbound>,
}

impl Session {
    pub fn new(
        player_id: PlayerId,
        username: impl Into<String>,
        avatar_id: impl Into<String>,
        sender: mpsc::UnboundedSender<Outbound>,
    ) -> Self {
        Self {
            player_id,
            username: username.into(),
            avatar_id: avatar_id.into(),
            connection_id: Uuid::new_v4(),
            current_lobby: None,
            ready: false,
            sender,
        }
    }

    pub fn in_lobby(&self, lobby_id: &LobbyId) -> bool {
        self.current_lobby.as_ref() == Some(lobby_id)
    }

    /// Queue a frame without waiting. Returns false if the writer is gone.
    pub fn send(&self, frame: Outbound) -> bool {
        self.sender.send(frame).is_ok()
    }
}

#[derive(Default)]
pub struct ConnectionTable {
    sessions: RwLock<HashMap<PlayerId, Session>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session. A previous session of the same player is returned
    /// so the caller can close it.
    ///
    /// The new session takes over the previous one's lobby and ready flag, so
    /// the membership is released when the newest socket closes.
    pub async fn register(&self, mut session: Session) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        if let Some(old) = sessions.get(&session.player_id) {
            session.current_lobby = old.current_lobby.clone();
            session.ready = old.ready;
        }
        sessions.insert(session.player_id.clone(), session)
    }

    /// Remove the player's session if it still belongs to `connection_id`.
    pub async fn unregister(&self, player_id: &PlayerId, connection_id: Uuid) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(player_id) {
            Some(s) if s.connection_id == connection_id => sessions.remove(player_id),
            _ => None,
        }
    }

    pub async fn get(&self, player_id: &PlayerId) -> Option<Session> {
        self.sessions.read().await.get(player_id).cloned()
    }

    /// Whether `connection_id` is the player's current connection.
    pub async fn is_current(&self, player_id: &PlayerId, connection_id: Uuid) -> bool {
        self.sessions
            .read()
            .await
            .get(player_id)
            .is_some_and(|s| s.connection_id == connection_id)
    }

    pub async fn set_lobby(&self, player_id: &PlayerId, lobby_id: Option<LobbyId>) {
        if let Some(s) = self.sessions.write().await.get_mut(player_id) {
            s.current_lobby = lobby_id;
            if s.current_lobby.is_none() {
                s.ready = false;
            }
        }
    }

    pub async fn set_ready(&self, player_id: &PlayerId, ready: bool) {
        if let Some(s) = self.sessions.write().await.get_mut(player_id) {
            s.ready = ready;
        }
    }

    /// Detach every session still pointing at `lobby_id`. Returns how many.
    pub async fn clear_lobby(&self, lobby_id: &LobbyId) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut cleared = 0;
        for s in sessions.values_mut().filter(|s| s.in_lobby(lobby_id)) {
            s.current_lobby = None;
            s.ready = false;
            cleared += 1;
        }
        cleared
    }

    /// Apply `f` to every session in `lobby_id` under one read guard.
    pub async fn for_each_in_lobby<F>(&self, lobby_id: &LobbyId, mut f: F)
    where
        F: FnMut(&Session),
    {
        let sessions = self.sessions.read().await;
        sessions.values().filter(|s| s.in_lobby(lobby_id)).for_each(&mut f);
    }

    pub async fn for_each_all<F>(&self, f: F)
    where
        F: FnMut(&Session),
    {
        self.sessions.read().await.values().for_each(f);
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
