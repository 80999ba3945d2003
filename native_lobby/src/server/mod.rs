pub mod connections;
pub mod fanout;
pub mod http;
pub mod registry;
pub mod router;
pub mod run;
pub mod state;
pub mod ws;

// Export commonly used types and functions
pub use connections::{ConnectionTable, Session};
pub use registry::{Lobby, LobbyRegistry, Player};
pub use run::{build_router, run_server};
pub use state::AppState;
