//! Wire protocol shared by the lobby server and its clients.

pub mod messages;
pub mod player;

pub use messages::*;
pub use player::*;
