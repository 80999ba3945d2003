//! Lobby registry: the authoritative owner of every lobby and its players.
//!
//! All operations take the single registry-wide lock for their whole
//! duration, so each one is atomic with respect to the others. Readers
//! (`get`, `list`, `all_ready`) share the lock; writers are serialized.
//!
//! Lock order: the registry lock is always acquired before the connection
//! table lock. Nothing in this module touches the connection table.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use lobby_shared::{LobbyId, LobbyStatePayload, PlayerId, PlayerInfo};
use tokio::sync::RwLock;

use crate::error::{LobbyError, LobbyResult};

pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub avatar_id: String,
    pub ready: bool,
    /// Registry-wide join sequence; lowest remaining member becomes host.
    pub(crate) joined_seq: u64,
}

impl Player {
    pub fn new(id: PlayerId, username: impl Into<String>, avatar_id: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            avatar_id: avatar_id.into(),
            ready: false,
            joined_seq: 0,
        }
    }

    pub fn with_ready(mut self, ready: bool) -> Self {
        self.ready = ready;
        self
    }
}

#[derive(Clone, Debug)]
pub struct Lobby {
    pub id: LobbyId,
    pub game_id: String,
    pub game_name: String,
    pub host_id: PlayerId,
    pub max_players: usize,
    pub created_at: DateTime<Utc>,
    pub players: HashMap<PlayerId, Player>,
}

impl Lobby {
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    pub fn is_host(&self, player_id: &PlayerId) -> bool {
        &self.host_id == player_id
    }

    /// Members ordered by join sequence.
    pub fn players_in_join_order(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by_key(|p| p.joined_seq);
        players
    }

    pub fn state_payload(&self) -> LobbyStatePayload {
        LobbyStatePayload {
            lobby_id: self.id.clone(),
            game_name: self.game_name.clone(),
            max_players: self.max_players,
            host_id: self.host_id.clone(),
            players: self
                .players_in_join_order()
                .into_iter()
                .map(|p| PlayerInfo {
                    id: p.id.clone(),
                    username: p.username.clone(),
                    avatar_id: p.avatar_id.clone(),
                    ready: p.ready,
                    is_host: p.id == self.host_id,
                })
                .collect(),
        }
    }

    /// Lowest join sequence among current members.
    fn earliest_member(&self) -> Option<PlayerId> {
        self.players
            .values()
            .min_by_key(|p| p.joined_seq)
            .map(|p| p.id.clone())
    }
}

/// Result of a successful join.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinOutcome {
    /// The player was already a member; capacity and ready flag untouched.
    pub rejoined: bool,
    pub ready: bool,
    pub is_host: bool,
}

/// Result of a successful leave.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Set when the leaver was host and someone else took over.
    pub new_host: Option<PlayerId>,
    /// The lobby became empty and was removed.
    pub closed: bool,
}

#[derive(Default)]
struct Inner {
    lobbies: HashMap<LobbyId, Lobby>,
    next_seq: u64,
}

impl Inner {
    fn lobby_mut(&mut self, id: &LobbyId) -> LobbyResult<&mut Lobby> {
        self.lobbies.get_mut(id).ok_or(LobbyError::LobbyNotFound)
    }

    fn insert_new(&mut self, host_id: PlayerId, game_name: &str, max_players: i64) -> LobbyResult<LobbyId> {
        let max_players = validate_max_players(max_players)?;
        let lobby = Lobby {
            id: LobbyId(uuid::Uuid::new_v4().to_string()),
            game_id: uuid::Uuid::new_v4().to_string(),
            game_name: game_name.to_owned(),
            host_id,
            max_players,
            created_at: Utc::now(),
            players: HashMap::new(),
        };
        let id = lobby.id.clone();
        self.lobbies.insert(id.clone(), lobby);
        Ok(id)
    }

    fn join(&mut self, lobby_id: &LobbyId, mut player: Player) -> LobbyResult<JoinOutcome> {
        self.next_seq += 1;
        let seq = self.next_seq;
        let lobby = self.lobby_mut(lobby_id)?;

        if let Some(existing) = lobby.players.get_mut(&player.id) {
            existing.username = player.username;
            existing.avatar_id = player.avatar_id;
            return Ok(JoinOutcome {
                rejoined: true,
                ready: existing.ready,
                is_host: lobby.host_id == existing.id,
            });
        }

        if lobby.is_full() {
            return Err(LobbyError::LobbyFull);
        }

        player.joined_seq = seq;
        let outcome = JoinOutcome {
            rejoined: false,
            ready: player.ready,
            is_host: lobby.host_id == player.id,
        };
        lobby.players.insert(player.id.clone(), player);
        Ok(outcome)
    }
}

pub(crate) fn validate_max_players(max_players: i64) -> LobbyResult<usize> {
    match usize::try_from(max_players) {
        Ok(n) if (MIN_PLAYERS..=MAX_PLAYERS).contains(&n) => Ok(n),
        _ => Err(LobbyError::InvalidConfig {
            got: max_players,
            min: MIN_PLAYERS,
            max: MAX_PLAYERS,
        }),
    }
}

/// Process-scoped lobby store. Cheap to share behind an `Arc`.
#[derive(Default)]
pub struct LobbyRegistry {
    inner: RwLock<Inner>,
}

impl LobbyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a lobby with `host_id` recorded as host but not yet a member.
    pub async fn create(&self, host_id: PlayerId, game_name: &str, max_players: i64) -> LobbyResult<Lobby> {
        let mut inner = self.inner.write().await;
        let id = inner.insert_new(host_id, game_name, max_players)?;
        inner.lobby_mut(&id).map(|l| l.clone())
    }

    /// Create a lobby and add `host` to it in one atomic step.
    pub async fn create_and_join(&self, host: Player, game_name: &str, max_players: i64) -> LobbyResult<Lobby> {
        let mut inner = self.inner.write().await;
        let id = inner.insert_new(host.id.clone(), game_name, max_players)?;
        inner.join(&id, host)?;
        inner.lobby_mut(&id).map(|l| l.clone())
    }

    pub async fn get(&self, id: &LobbyId) -> Option<Lobby> {
        self.inner.read().await.lobbies.get(id).cloned()
    }

    /// Remove a lobby unconditionally. Returns whether anything was removed.
    pub async fn close(&self, id: &LobbyId) -> bool {
        self.inner.write().await.lobbies.remove(id).is_some()
    }

    pub async fn list(&self) -> Vec<Lobby> {
        self.inner.read().await.lobbies.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.lobbies.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn join(&self, lobby_id: &LobbyId, player: Player) -> LobbyResult<JoinOutcome> {
        self.inner.write().await.join(lobby_id, player)
    }

    pub async fn leave(&self, lobby_id: &LobbyId, player_id: &PlayerId) -> LobbyResult<LeaveOutcome> {
        let mut inner = self.inner.write().await;
        let lobby = inner.lobby_mut(lobby_id)?;
        if lobby.players.remove(player_id).is_none() {
            return Err(LobbyError::PlayerNotFound);
        }

        if lobby.players.is_empty() {
            inner.lobbies.remove(lobby_id);
            return Ok(LeaveOutcome {
                new_host: None,
                closed: true,
            });
        }

        let mut new_host = None;
        if &lobby.host_id == player_id {
            if let Some(next) = lobby.earliest_member() {
                lobby.host_id = next.clone();
                new_host = Some(next);
            }
        }
        Ok(LeaveOutcome {
            new_host,
            closed: false,
        })
    }

    pub async fn set_ready(&self, lobby_id: &LobbyId, player_id: &PlayerId, ready: bool) -> LobbyResult<()> {
        let mut inner = self.inner.write().await;
        let player = inner
            .lobby_mut(lobby_id)?
            .players
            .get_mut(player_id)
            .ok_or(LobbyError::PlayerNotFound)?;
        player.ready = ready;
        Ok(())
    }

    /// Flip a player's ready flag and return the new value.
    pub async fn toggle_ready(&self, lobby_id: &LobbyId, player_id: &PlayerId) -> LobbyResult<bool> {
        let mut inner = self.inner.write().await;
        let player = inner
            .lobby_mut(lobby_id)?
            .players
            .get_mut(player_id)
            .ok_or(LobbyError::PlayerNotFound)?;
        player.ready = !player.ready;
        Ok(player.ready)
    }

    /// `false` for an empty lobby: an empty lobby is never ready to start.
    pub async fn all_ready(&self, lobby_id: &LobbyId) -> LobbyResult<bool> {
        let inner = self.inner.read().await;
        let lobby = inner.lobbies.get(lobby_id).ok_or(LobbyError::LobbyNotFound)?;
        Ok(!lobby.players.is_empty() && lobby.players.values().all(|p| p.ready))
    }

    /// Check that `player_id` may start `lobby_id` right now and return the
    /// lobby as seen by that check. Host and readiness are read under one
    /// guard.
    pub async fn can_start(&self, lobby_id: &LobbyId, player_id: &PlayerId) -> LobbyResult<Lobby> {
        let inner = self.inner.read().await;
        let lobby = inner.lobbies.get(lobby_id).ok_or(LobbyError::LobbyNotFound)?;
        if !lobby.is_host(player_id) {
            return Err(LobbyError::Unauthorized {
                action: "start the game",
            });
        }
        if lobby.players.is_empty() || !lobby.players.values().all(|p| p.ready) {
            return Err(LobbyError::NotAllReady);
        }
        Ok(lobby.clone())
    }
}
