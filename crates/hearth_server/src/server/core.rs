//! Core session server implementation.
//!
//! This module contains the `SessionServer` struct, which binds the listener,
//! runs the accept loop and the idle reaper, and shuts both down on request.

use crate::{
    config::ServerConfig,
    connection::CloseCode,
    context::ServerContext,
    error::ServerError,
    handlers::default_dispatch_table,
    messaging::DispatchTable,
    server::{handlers::handle_connection, reaper::IdleReaper, shutdown::ShutdownState},
    session::SessionManager,
};
use futures::future::join_all;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// The session server.
///
/// Accepts WebSocket clients, gives each one a session loop and keeps idle
/// clients in check. All game behaviour lives in the message handlers of the
/// dispatch table.
pub struct SessionServer {
    /// Server configuration settings
    config: ServerConfig,

    /// Shared state handed to every handler
    context: Arc<ServerContext>,

    /// Runs one session loop per client
    manager: SessionManager,

    /// Admission permits, one per allowed live session
    slots: Arc<Semaphore>,
}

impl SessionServer {
    /// Creates a server with the in-memory store and the built-in handlers.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration parameters for server behavior
    ///
    /// # Returns
    ///
    /// A new `SessionServer` ready to be started, or a `ServerError` if the
    /// configuration or the handler table is invalid.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let context = ServerContext::in_memory(config.password_hash_cost, config.rooms.clone());
        Self::with_context(config, Arc::new(context), default_dispatch_table()?)
    }

    /// Creates a server around an existing context and dispatch table.
    pub fn with_context(
        config: ServerConfig,
        context: Arc<ServerContext>,
        dispatch: DispatchTable,
    ) -> Result<Self, ServerError> {
        config.validate()?;
        let manager = SessionManager::new(context.clone(), Arc::new(dispatch));
        let slots = Arc::new(Semaphore::new(config.max_connections));
        Ok(Self {
            config,
            context,
            manager,
            slots,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.context
    }

    /// Binds the configured address and serves until shutdown.
    ///
    /// # Arguments
    ///
    /// * `shutdown` - Shared shutdown state for coordinating graceful shutdown
    pub async fn start(&self, shutdown: ShutdownState) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| ServerError::Network(format!("Failed to bind {}: {e}", self.config.bind_address)))?;
        self.serve(listener, shutdown).await
    }

    /// Runs the accept loop on an already bound listener until shutdown.
    pub async fn serve(&self, listener: TcpListener, shutdown: ShutdownState) -> Result<(), ServerError> {
        let local_addr: SocketAddr = listener
            .local_addr()
            .map_err(|e| ServerError::Network(e.to_string()))?;
        info!("🚀 Session server listening on ws://{}{}", local_addr, self.config.websocket_path);
        info!(
            "⏱️ Idle timeout {}s, sweep every {}s",
            self.config.idle_timeout_secs, self.config.reaper_interval_secs
        );

        let reaper = IdleReaper::new(
            self.context.sessions().clone(),
            self.config.idle_timeout(),
            self.config.reaper_interval(),
        )
        .spawn(shutdown.clone());

        let stop = shutdown.wait_for_shutdown();
        tokio::pin!(stop);

        loop {
            tokio::select! {
                _ = &mut stop => {
                    info!("🛑 Accept loop stopping - shutdown initiated");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                        }
                        let manager = self.manager.clone();
                        let path = self.config.websocket_path.clone();
                        let slots = self.slots.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, addr, manager, path, slots).await {
                                debug!("Connection from {} failed: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                }
            }
        }

        self.close_all_sessions().await;
        if let Err(e) = reaper.await {
            warn!("Idle reaper task failed: {}", e);
        }

        info!("✅ Server stopped");
        Ok(())
    }

    /// Closes every live connection. Session loops notice and clean up.
    async fn close_all_sessions(&self) {
        let sessions = self.context.sessions().sessions();
        if sessions.is_empty() {
            return;
        }
        info!("🧹 Closing {} active session(s)...", sessions.len());
        join_all(
            sessions
                .iter()
                .map(|session| session.connection().close(CloseCode::Away, "server shutting down")),
        )
        .await;
    }
}
