use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::connections::ConnectionTable;
use super::registry::LobbyRegistry;
use crate::config::Config;

/// Shared application state exposed to handlers.
///
/// Registry and connection table are owned here rather than in globals so
/// that tests can run several isolated servers in one process.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<LobbyRegistry>,
    pub connections: Arc<ConnectionTable>,
    pub config: Arc<RwLock<Config>>,
    /// Path of the TOML file the config was loaded from, if any.
    pub config_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            registry: Arc::new(LobbyRegistry::new()),
            connections: Arc::new(ConnectionTable::new()),
            config: Arc::new(RwLock::new(config)),
            config_path,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Config::default(), None)
    }
}
