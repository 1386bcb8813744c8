//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and default values
//! used to initialize the session server. Configuration is read once at
//! startup and never changes afterwards.

use crate::error::ServerError;
use crate::security::{DEFAULT_HASH_COST, MAX_HASH_COST, MIN_HASH_COST};
use crate::world::{RoomTemplate, DEFAULT_ROOM_ID};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Configuration structure for the session server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Request path WebSocket upgrades are accepted on
    pub websocket_path: String,

    /// Maximum number of concurrent sessions allowed
    pub max_connections: usize,

    /// Seconds without any received message before a client is disconnected
    pub idle_timeout_secs: u64,

    /// Seconds between two idle sweeps
    pub reaper_interval_secs: u64,

    /// bcrypt work factor for new password hashes
    pub password_hash_cost: u32,

    /// Room templates known to the server
    pub rooms: Vec<RoomTemplate>,
}

impl ServerConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn reaper_interval(&self) -> Duration {
        Duration::from_secs(self.reaper_interval_secs)
    }

    /// Checks the values a running server depends on.
    pub fn validate(&self) -> Result<(), ServerError> {
        if !self.websocket_path.starts_with('/') {
            return Err(ServerError::Config(format!(
                "websocket path must start with '/': {}",
                self.websocket_path
            )));
        }
        if self.max_connections == 0 || self.max_connections > Semaphore::MAX_PERMITS {
            return Err(ServerError::Config(format!(
                "max_connections must be within 1..={}",
                Semaphore::MAX_PERMITS
            )));
        }
        if self.idle_timeout_secs == 0 || self.reaper_interval_secs == 0 {
            return Err(ServerError::Config("idle timeout and reaper interval must be non-zero".into()));
        }
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&self.password_hash_cost) {
            return Err(ServerError::Config(format!(
                "password hash cost must be within {}..={}, got {}",
                MIN_HASH_COST, MAX_HASH_COST, self.password_hash_cost
            )));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            websocket_path: "/ws".to_string(),
            max_connections: 1000,
            idle_timeout_secs: 30,
            reaper_interval_secs: 30,
            password_hash_cost: DEFAULT_HASH_COST,
            rooms: vec![RoomTemplate {
                id: DEFAULT_ROOM_ID,
                title: "Lobby".to_string(),
            }],
        }
    }
}
