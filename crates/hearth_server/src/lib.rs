//! # Hearth Server - Session and Messaging Core
//!
//! The real-time core of a multiplayer game backend. It accepts persistent
//! WebSocket connections from game clients, authenticates them, tracks their
//! state as they move from anonymous to logged in to playing, dispatches their
//! binary messages to handlers and fans out chat, movement and room events to
//! the other players.
//!
//! ## Architecture Overview
//!
//! * **Messaging** - fixed-size [`MessageBuffer`]s, a lock-free buffer pool
//!   and the [`DispatchTable`] mapping message ids to handlers
//! * **Connections** - one [`ClientConnection`] per socket with idempotent
//!   close and activity tracking
//! * **Sessions** - per-client [`Session`] state, the multi-key
//!   [`SessionRegistry`] and the session loop in [`SessionManager`]
//! * **World** - [`Room`]s as broadcast groups, created on demand by the
//!   [`RoomRegistry`]
//! * **Server** - the accept loop ([`SessionServer`]) and the [`IdleReaper`]
//!
//! ### Message Flow
//!
//! 1. A client sends one binary frame: a little-endian `u16` id and a body
//! 2. The session loop reads it into its pooled buffer
//! 3. The handler registered for the id processes it against the session
//! 4. Replies and broadcasts are built from the pool and sent best-effort
//! 5. Unknown ids, malformed bodies and handler rejections end the session
//!
//! ## Error Handling
//!
//! Each layer has its own error enum in [`error`]. Errors never leave the
//! session they occurred in: the loop logs them by severity and cleans up.
//!
//! ## Thread Safety
//!
//! * Registries are built on `DashMap` and safe to use from any task
//! * Account and character claims are atomic per index entry
//! * Messages of one session are processed strictly in arrival order

// Re-export core types and functions for easy access
pub use config::ServerConfig;
pub use connection::{ClientConnection, CloseCode};
pub use context::ServerContext;
pub use error::{CodecError, ConnectionError, DispatchError, ServerError, SessionError, StoreError};
pub use handlers::default_dispatch_table;
pub use messaging::{DispatchTable, MessageBuffer, MessageHandler, MessagePool, PooledMessage, Vector3i};
pub use server::{IdleReaper, SessionServer, ShutdownState};
pub use session::{Session, SessionManager, SessionRegistry};
pub use utils::{create_server, create_server_with_config};
pub use world::{Room, RoomRegistry, RoomTemplate, DEFAULT_ROOM_ID};

// Public module declarations
pub mod config;
pub mod connection;
pub mod context;
pub mod error;
pub mod handlers;
pub mod messaging;
pub mod security;
pub mod server;
pub mod session;
pub mod store;
pub mod utils;
pub mod world;

#[cfg(test)]
mod test_support;
