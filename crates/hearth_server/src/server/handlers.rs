//! Connection handling logic for WebSocket clients.
//!
//! This module takes an accepted TCP socket through the WebSocket upgrade and
//! hands the resulting connection to the session loop.

use crate::{
    connection::{websocket_config, ClientConnection, CloseCode, Transport},
    error::ServerError,
    session::SessionManager,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::accept_hdr_async_with_config;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, info};

/// Upper bound for a client to complete the WebSocket upgrade.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Handles a single client connection from establishment to cleanup.
///
/// # Arguments
///
/// * `stream` - The TCP stream for the client connection
/// * `addr` - The remote address of the client
/// * `manager` - Session manager running the session loop
/// * `websocket_path` - The only request path upgrades are accepted on
/// * `slots` - One permit per allowed live session; clients finding none left
///   are turned away
///
/// # Returns
///
/// `Ok(())` once the session has ended, or a `ServerError` if the upgrade
/// failed.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    manager: SessionManager,
    websocket_path: String,
    slots: Arc<Semaphore>,
) -> Result<(), ServerError> {
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        if request.uri().path() == websocket_path {
            return Ok(response);
        }
        debug!("Rejecting upgrade from {} for path {}", addr, request.uri().path());
        let mut error = ErrorResponse::new(Some(format!("no endpoint at {}", request.uri().path())));
        *error.status_mut() = StatusCode::NOT_FOUND;
        Err(error)
    };

    let transport: Box<dyn Transport> = Box::new(stream);
    let upgrade = accept_hdr_async_with_config(transport, callback, Some(websocket_config()));
    let socket = timeout(HANDSHAKE_TIMEOUT, upgrade)
        .await
        .map_err(|_| ServerError::Network(format!("WebSocket handshake with {addr} timed out")))?
        .map_err(|e| ServerError::Network(format!("WebSocket handshake failed: {e}")))?;

    let connection = ClientConnection::new(socket, Some(addr), manager.context().pool().clone());

    // Held until the session loop returns.
    let Ok(_slot) = slots.try_acquire_owned() else {
        info!("🚫 Connection limit reached, turning away {}", addr);
        connection.close(CloseCode::Again, "server full").await;
        return Ok(());
    };

    debug!("🔌 Client connected from {}", addr);
    manager.handle_client(connection).await;
    debug!("👋 Client {} disconnected", addr);
    Ok(())
}
