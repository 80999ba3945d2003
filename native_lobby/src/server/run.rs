// Run and routing helpers (build_router, run_server).

use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::server::AppState;
use anyhow::{Context, Result};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(crate::server::http::health_handler))
        .route("/ws", get(crate::server::ws::ws_handler))
        .route("/api/lobbies", get(crate::server::http::lobbies_handler))
        .route("/api/lobbies/:lobby_id", get(crate::server::http::lobby_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = build_router(state);

    let display_addr = if addr.ip().is_loopback() {
        format!("localhost:{}", addr.port())
    } else {
        addr.to_string()
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", display_addr))?;

    tracing::info!(display_addr = %display_addr, "lobby server running");
    println!("\n\x1b[1;36m=== Lobby Server ===\x1b[0m");
    println!(
        "\x1b[1mWebSocket:\x1b[0m \x1b[4;34mws://{}/ws\x1b[0m",
        display_addr
    );
    println!("\x1b[1;36m====================\x1b[0m\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;
    tracing::info!("lobby server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
