use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "lobby-cli", version, about = "Headless CLI for the lobby server", long_about = None)]
pub struct Cli {
    /// Server base URL. http(s):// and ws(s):// forms are both accepted.
    #[arg(long, default_value = "http://localhost:8080")]
    pub server: String,

    /// Player id to introduce ourselves with
    #[arg(long, default_value = "cli")]
    pub user_id: String,

    /// Display name
    #[arg(short, long, default_value = "CLI")]
    pub name: String,

    #[arg(long, default_value = "")]
    pub avatar_id: String,

    /// Lobby to (re)enter right after connecting (reconnect path)
    #[arg(long)]
    pub lobby: Option<String>,

    /// How long to wait for further server messages after the last one (ms)
    #[arg(long, default_value_t = 1200)]
    pub wait_ms: u64,

    /// Output JSON instead of human-readable text
    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List open lobbies over HTTP
    List,
    /// Run lobby commands in order over one connection, e.g.
    /// `script "create Poker 4" ready`. Leaving ends the membership, so use
    /// --stay to keep the lobby after the last step.
    Script {
        #[arg(required = true)]
        steps: Vec<String>,
        /// Keep the connection (and lobby membership) open after the last step
        #[arg(long, default_value_t = false)]
        stay: bool,
    },
    /// Read lobby commands from stdin, one per line, over one connection.
    /// `quit` or end of input closes the session.
    Session,
    /// Stay connected and print every message
    Watch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_script_with_defaults() {
        let cli = Cli::parse_from(["lobby-cli", "script", "create Poker 4", "ready"]);
        assert_eq!(cli.server, "http://localhost:8080");
        assert!(matches!(
            cli.command,
            Commands::Script { ref steps, stay: false } if steps == &["create Poker 4", "ready"]
        ));
    }

    #[test]
    fn parse_session_with_lobby() {
        let cli = Cli::parse_from(["lobby-cli", "--lobby", "l1", "--user-id", "a", "session"]);
        assert_eq!(cli.lobby.as_deref(), Some("l1"));
        assert_eq!(cli.user_id, "a");
        assert!(matches!(cli.command, Commands::Session));
    }

    #[test]
    fn script_needs_steps() {
        assert!(Cli::try_parse_from(["lobby-cli", "script"]).is_err());
    }
}
