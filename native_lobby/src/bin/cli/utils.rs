use std::io::IsTerminal;

use lobby_shared::{LobbyStatePayload, ServerMsg};
use owo_colors::OwoColorize;

pub struct MessagePrinter {
    json: bool,
    color: bool,
}

impl MessagePrinter {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            color: std::io::stdout().is_terminal(),
        }
    }

    pub fn handle(&mut self, msg: &ServerMsg) {
        if self.json {
            match serde_json::to_string(msg) {
                Ok(json_str) => println!("{}", json_str),
                Err(e) => eprintln!("Failed to serialize message to JSON: {}", e),
            }
            return;
        }
        match msg {
            ServerMsg::Error(e) => eprintln!("Server error: {}", e.message),
            other => println!("{}", self.format_human(other)),
        }
    }

    pub fn print_lobbies(&self, lobbies: &[LobbyStatePayload]) {
        if self.json {
            match serde_json::to_string_pretty(lobbies) {
                Ok(json_str) => println!("{}", json_str),
                Err(e) => eprintln!("Failed to serialize lobbies to JSON: {}", e),
            }
            return;
        }
        if lobbies.is_empty() {
            println!("No open lobbies");
        }
        for lobby in lobbies {
            println!("{}", format_lobby(lobby, self.color));
        }
    }

    fn tag(&self, kind: &str) -> String {
        let tag = format!("[{}]", kind);
        if self.color {
            tag.bold().cyan().to_string()
        } else {
            tag
        }
    }

    fn format_human(&self, msg: &ServerMsg) -> String {
        let body = match msg {
            ServerMsg::LobbyCreated(c) => format!(
                "created lobby {} ({}, up to {} players)",
                c.lobby_id, c.game_name, c.max_players
            ),
            ServerMsg::LobbyState(s) => format_lobby(s, self.color),
            ServerMsg::LobbyList(l) => format!("{} open lobbies", l.lobbies.len()),
            ServerMsg::LobbyClosed(c) => format!("lobby {} closed", c.lobby_id),
            ServerMsg::PlayerJoined(j) => format!("{} ({}) joined", j.username, j.user_id),
            ServerMsg::PlayerLeft(l) => format!("{} left", l.user_id),
            ServerMsg::HostChanged(h) => format!("{} is now host", h.new_host_id),
            ServerMsg::PlayerReadyChanged(r) => format!(
                "{} is {}",
                r.user_id,
                if r.ready { "ready" } else { "not ready" }
            ),
            ServerMsg::GameStarting(g) => format!("game {} starting", g.game_id),
            ServerMsg::PlayersReordered(o) => {
                let order: Vec<&str> = o.player_order.iter().map(|p| p.0.as_str()).collect();
                format!("seating order: {}", order.join(", "))
            }
            ServerMsg::Error(e) => e.message.clone(),
        };
        format!("{} {}", self.tag(msg.kind()), body)
    }
}

/// "<id> <game> 2/4 host=<id>: alice*, bob (ready)"
pub fn format_lobby(lobby: &LobbyStatePayload, color: bool) -> String {
    let players = lobby
        .players
        .iter()
        .map(|p| {
            let mut text = p.username.clone();
            if p.is_host {
                text.push('*');
            }
            if p.ready {
                text.push_str(" (ready)");
            }
            if color && p.ready {
                text = text.green().to_string();
            }
            text
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{} {} {}/{} host={}: {}",
        lobby.lobby_id,
        lobby.game_name,
        lobby.players.len(),
        lobby.max_players,
        lobby.host_id,
        players
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use lobby_shared::{LobbyId, PlayerId, PlayerInfo};

    #[test]
    fn lobby_line() {
        let lobby = LobbyStatePayload {
            lobby_id: LobbyId::from("l1"),
            game_name: "Poker".into(),
            max_players: 4,
            host_id: PlayerId::from("a"),
            players: vec![
                PlayerInfo {
                    id: PlayerId::from("a"),
                    username: "alice".into(),
                    avatar_id: String::new(),
                    ready: true,
                    is_host: true,
                },
                PlayerInfo {
                    id: PlayerId::from("b"),
                    username: "bob".into(),
                    avatar_id: String::new(),
                    ready: false,
                    is_host: false,
                },
            ],
        };
        assert_eq!(
            format_lobby(&lobby, false),
            "l1 Poker 2/4 host=a: alice* (ready), bob"
        );
    }
}
