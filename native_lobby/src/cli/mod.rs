use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;

/// Server CLI for lobby-server
#[derive(Parser, Debug, Clone)]
#[command(name = "lobby-server", version, about = "Game lobby matchmaking server")]
pub struct ServerCli {
    /// Path to config file
    #[arg(long, default_value = "lobby-server.toml")]
    pub config: PathBuf,

    /// Interface to bind (overrides config)
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Port to listen on (overrides config)
    #[arg(long)]
    pub port: Option<u16>,

    /// Persist CLI overrides back to the config file
    #[arg(long, default_value_t = false)]
    pub persist: bool,

    /// Verbose logging with targets, threads and source locations
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

impl ServerCli {
    /// Apply host/port overrides in memory. Returns whether anything changed.
    pub fn apply_overrides(&self, cfg: &mut crate::config::Config) -> bool {
        let mut changed = false;
        if let Some(host) = self.host {
            changed |= cfg.host != host;
            cfg.host = host;
        }
        if let Some(port) = self.port {
            changed |= cfg.port != port;
            cfg.port = port;
        }
        changed
    }
}
