//! Text commands understood by `script` and `session`, one per line:
//!
//! ```text
//! create <game name> [max players]
//! join <lobby id>
//! leave | ready | start | list
//! reorder <player id>...
//! ```

use anyhow::{anyhow, bail};
use lobby_shared::{
    ClientMsg, CreateLobbyPayload, JoinLobbyPayload, LobbyId, PlayerId, ReorderPlayersPayload,
};

pub const DEFAULT_MAX_PLAYERS: i64 = 4;

/// Parse one step. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_step(line: &str) -> anyhow::Result<Option<ClientMsg>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<&str> = words.collect();

    let msg = match command.as_str() {
        "create" => {
            let (name, max_players) = match args.split_last() {
                Some((last, rest)) if !rest.is_empty() => match last.parse::<i64>() {
                    Ok(n) => (rest.join(" "), n),
                    Err(_) => (args.join(" "), DEFAULT_MAX_PLAYERS),
                },
                _ => (args.join(" "), DEFAULT_MAX_PLAYERS),
            };
            if name.is_empty() {
                bail!("usage: create <game name> [max players]");
            }
            ClientMsg::CreateLobby(CreateLobbyPayload {
                game_name: name,
                max_players,
            })
        }
        "join" => match args.as_slice() {
            [lobby_id] => ClientMsg::JoinLobby(JoinLobbyPayload {
                lobby_id: LobbyId::from(*lobby_id),
            }),
            _ => bail!("usage: join <lobby id>"),
        },
        "leave" => ClientMsg::LeaveLobby,
        "ready" => ClientMsg::ToggleReady,
        "start" => ClientMsg::StartGame,
        "list" => ClientMsg::ListLobbies,
        "reorder" => {
            if args.is_empty() {
                bail!("usage: reorder <player id>...");
            }
            ClientMsg::ReorderPlayers(ReorderPlayersPayload {
                player_order: args.iter().copied().map(PlayerId::from).collect(),
            })
        }
        other => return Err(anyhow!("unknown command '{}'", other)),
    };
    Ok(Some(msg))
}

/// Whether `line` asks an interactive session to end.
pub fn is_quit(line: &str) -> bool {
    matches!(line.trim(), "quit" | "exit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_with_and_without_capacity() {
        assert_eq!(
            parse_step("create Texas Holdem 6").unwrap(),
            Some(ClientMsg::CreateLobby(CreateLobbyPayload {
                game_name: "Texas Holdem".into(),
                max_players: 6,
            }))
        );
        assert_eq!(
            parse_step("  create Poker ").unwrap(),
            Some(ClientMsg::CreateLobby(CreateLobbyPayload {
                game_name: "Poker".into(),
                max_players: DEFAULT_MAX_PLAYERS,
            }))
        );
        assert!(parse_step("create").is_err());
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse_step("ready").unwrap(), Some(ClientMsg::ToggleReady));
        assert_eq!(parse_step("START").unwrap(), Some(ClientMsg::StartGame));
        assert_eq!(parse_step("leave").unwrap(), Some(ClientMsg::LeaveLobby));
        assert_eq!(parse_step("list").unwrap(), Some(ClientMsg::ListLobbies));
        assert_eq!(
            parse_step("join l1").unwrap(),
            Some(ClientMsg::JoinLobby(JoinLobbyPayload {
                lobby_id: LobbyId::from("l1"),
            }))
        );
        assert_eq!(
            parse_step("reorder b a").unwrap(),
            Some(ClientMsg::ReorderPlayers(ReorderPlayersPayload {
                player_order: vec![PlayerId::from("b"), PlayerId::from("a")],
            }))
        );
    }

    #[test]
    fn blanks_comments_and_errors() {
        assert_eq!(parse_step("").unwrap(), None);
        assert_eq!(parse_step("   # wait for bob").unwrap(), None);
        assert!(parse_step("join").is_err());
        assert!(parse_step("join a b").is_err());
        assert!(parse_step("reorder").is_err());
        assert!(parse_step("dance").is_err());
        assert!(is_quit(" quit "));
        assert!(!is_quit("leave"));
    }
}
