pub mod args;
pub mod steps;
pub mod transport;
pub mod utils;

pub use args::*;
pub use steps::*;
pub use transport::*;
pub use utils::*;
