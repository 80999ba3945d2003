use owo_colors::OwoColorize;

use crate::server::registry::{Lobby, Player};

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn format_player(p: &Player, is_host: bool, color: bool) -> String {
    let mut text = p.username.clone();
    if is_host {
        text.push('*');
    }
    if color {
        text = if p.ready {
            text.green().to_string()
        } else {
            text.dimmed().to_string()
        };
    } else if p.ready {
        text.push_str(" (ready)");
    }
    text
}

/// One-line summary of a lobby for server logs.
///
/// Host is marked with `*`; ready players are green (or tagged `(ready)`
/// without color).
pub fn format_lobby_human(lobby: &Lobby, color: bool) -> String {
    let players = lobby
        .players_in_join_order()
        .into_iter()
        .map(|p| format_player(p, lobby.is_host(&p.id), color))
        .collect::<Vec<_>>()
        .join(", ");
    let header = format!("[{}]", short_id(&lobby.id.0));
    let header = if color {
        header.bold().cyan().to_string()
    } else {
        header
    };
    format!(
        "{} {} {}/{}: {}",
        header,
        lobby.game_name,
        lobby.players.len(),
        lobby.max_players,
        players
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::registry::LobbyRegistry;
    use lobby_shared::PlayerId;

    #[tokio::test]
    async fn plain_summary_marks_host_and_ready() {
        let registry = LobbyRegistry::new();
        let lobby = registry
            .create_and_join(
                Player::new(PlayerId::from("a"), "alice", "").with_ready(true),
                "Poker",
                4,
            )
            .await
            .unwrap();
        registry
            .join(&lobby.id, Player::new(PlayerId::from("b"), "bob", ""))
            .await
            .unwrap();
        let lobby = registry.get(&lobby.id).await.unwrap();

        let line = format_lobby_human(&lobby, false);
        assert!(line.contains("Poker 2/4"), "{line}");
        assert!(line.ends_with("alice* (ready), bob"), "{line}");
        assert!(line.starts_with(&format!("[{}]", &lobby.id.0[..8])));
    }
}
