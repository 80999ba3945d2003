//! Main entry point for the lobby server.

use native_lobby::{cli, config, server};

use anyhow::Context;
use clap::Parser;
use config::Config;
use server::AppState;
use std::net::{IpAddr, SocketAddr, TcpListener};
use std::ops::RangeInclusive;
use std::path::PathBuf;

/// Parse CLI args, load config and run the server.
///
/// Usage:
///   lobby-server [--config PATH] [--host IP] [--port PORT] [--persist] [--debug]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::ServerCli::parse();

    // If debug is on: show everything at DEBUG level
    // If debug is off: our crates at INFO, everything else at WARN
    let log_filter = if cli.debug {
        "debug".to_string()
    } else {
        "native_lobby=info,lobby_shared=info,warn".to_string()
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(cli.debug)
        .with_thread_ids(cli.debug)
        .with_file(cli.debug)
        .with_line_number(cli.debug)
        .init();

    let config_path: PathBuf = cli.config.clone();

    // Load or create config file (creates file if missing).
    let mut cfg = Config::load_or_create(&config_path)
        .with_context(|| format!("loading or creating config '{}'", config_path.display()))?;

    // Apply CLI overrides in-memory (non-persistent by default)
    let overridden = cli.apply_overrides(&mut cfg);

    if overridden && cli.persist {
        cfg.save(&config_path)
            .with_context(|| format!("saving updated config '{}'", config_path.display()))?;
    }

    tracing::info!(config = %config_path.display(), host = %cfg.host, port = cfg.port);

    let port = find_available_port(cfg.host, cfg.port, cfg.port_search)
        .map_err(|e| anyhow::anyhow!("Could not find an available port: {}", e))?;
    if port != cfg.port {
        tracing::warn!(port, configured = cfg.port, "configured port was not available, using alternative port");
    }
    let addr = SocketAddr::new(cfg.host, port);

    let state = AppState::new(cfg, Some(config_path));
    server::run_server(addr, state).await?;
    Ok(())
}

/// Ports tried for `start_port` and a span of `span`, `start_port` included.
/// The range is clamped at 65535 instead of wrapping.
fn candidate_ports(start_port: u16, span: u16) -> RangeInclusive<u16> {
    start_port..=start_port.saturating_add(span.max(1) - 1)
}

/// Find the first available port among `candidate_ports(start_port, span)`.
fn find_available_port(host: IpAddr, start_port: u16, span: u16) -> anyhow::Result<u16> {
    let ports = candidate_ports(start_port, span);
    for port in ports.clone() {
        if TcpListener::bind((host, port)).is_ok() {
            return Ok(port);
        }
    }
    Err(anyhow::anyhow!(
        "No available ports found in range {}..={}",
        ports.start(),
        ports.end()
    ))
}
