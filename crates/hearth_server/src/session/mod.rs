//! Sessions: per-client state, the registry indexing them and the loop that
//! drives each one.

pub mod manager;
pub mod player;
pub mod registry;

pub use manager::{LoopExit, SessionManager};
pub use player::Session;
pub use registry::SessionRegistry;
