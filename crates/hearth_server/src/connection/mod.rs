//! Client connections.
//!
//! This module wraps an upgraded WebSocket in a [`ClientConnection`] which
//! handles message framing, idempotent closing and activity tracking.

pub mod client;

pub use client::{websocket_config, ClientConnection, ClientStream, ConnectionState, Transport, SEND_TIMEOUT};
pub use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
