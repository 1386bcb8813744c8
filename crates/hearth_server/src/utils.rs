//! Utility functions and helper methods for the session server.
//!
//! This module provides convenient factory functions for creating server
//! instances with different configurations.

use crate::{config::ServerConfig, error::ServerError, server::SessionServer};

/// Creates a new session server with default configuration.
///
/// This is a convenience function for quickly setting up a server
/// with sensible defaults for development and testing.
///
/// # Example
///
/// ```rust
/// use hearth_server::create_server;
///
/// let server = create_server().expect("default configuration is valid");
/// assert_eq!(server.config().websocket_path, "/ws");
/// ```
pub fn create_server() -> Result<SessionServer, ServerError> {
    SessionServer::new(ServerConfig::default())
}

/// Creates a new session server with custom configuration.
///
/// # Arguments
///
/// * `config` - A `ServerConfig` instance with desired settings
///
/// # Example
///
/// ```rust
/// use hearth_server::{create_server_with_config, ServerConfig};
///
/// let config = ServerConfig {
///     bind_address: "0.0.0.0:9000".parse().unwrap(),
///     max_connections: 5000,
///     ..Default::default()
/// };
///
/// let server = create_server_with_config(config).unwrap();
/// assert_eq!(server.config().max_connections, 5000);
/// ```
pub fn create_server_with_config(config: ServerConfig) -> Result<SessionServer, ServerError> {
    SessionServer::new(config)
}
