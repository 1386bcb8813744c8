//! Configuration management for the Hearth server.
//!
//! This module handles loading, validation, and conversion of server configuration
//! from TOML files. Command-line overrides are applied by the application on top
//! of the loaded values.

use hearth_server::security::{DEFAULT_HASH_COST, MAX_HASH_COST, MIN_HASH_COST};
use hearth_server::{RoomTemplate, ServerConfig, DEFAULT_ROOM_ID};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Log levels accepted by `logging.level`.
pub const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration settings
    pub server: ServerSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Server-specific configuration settings.
///
/// Controls network binding, connection limits, idle handling and the rooms
/// players can be placed in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "127.0.0.1:8080")
    pub bind_address: String,
    /// Request path WebSocket upgrades are accepted on
    #[serde(default = "default_websocket_path")]
    pub websocket_path: String,
    /// Maximum number of concurrent client connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Seconds a client may stay silent before it is disconnected
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    /// Seconds between idle sweeps
    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_secs: u64,
    /// bcrypt work factor for new accounts
    #[serde(default = "default_password_hash_cost")]
    pub password_hash_cost: u32,
    /// Room templates; the nil id is the room players enter after selection
    #[serde(default = "default_rooms")]
    pub rooms: Vec<RoomTemplate>,
}

fn default_websocket_path() -> String {
    "/ws".to_string()
}

fn default_max_connections() -> usize {
    1000
}

fn default_idle_timeout() -> u64 {
    30
}

fn default_reaper_interval() -> u64 {
    30
}

fn default_password_hash_cost() -> u32 {
    DEFAULT_HASH_COST
}

fn default_rooms() -> Vec<RoomTemplate> {
    vec![RoomTemplate {
        id: DEFAULT_ROOM_ID,
        title: "Lobby".to_string(),
    }]
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            websocket_path: default_websocket_path(),
            max_connections: default_max_connections(),
            idle_timeout_secs: default_idle_timeout(),
            reaper_interval_secs: default_reaper_interval(),
            password_hash_cost: default_password_hash_cost(),
            rooms: default_rooms(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to `path`
    /// and returns it.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the file settings into the server library's configuration.
    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            websocket_path: self.server.websocket_path.clone(),
            max_connections: self.server.max_connections,
            idle_timeout_secs: self.server.idle_timeout_secs,
            reaper_interval_secs: self.server.reaper_interval_secs,
            password_hash_cost: self.server.password_hash_cost,
            rooms: self.server.rooms.clone(),
        })
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("Invalid bind address: {}", &self.server.bind_address));
        }

        if !self.server.websocket_path.starts_with('/') {
            return Err(format!(
                "WebSocket path must start with '/': {}",
                &self.server.websocket_path
            ));
        }

        if self.server.max_connections == 0 {
            return Err("max_connections must be greater than 0".to_string());
        }

        if self.server.idle_timeout_secs == 0 {
            return Err("idle_timeout_secs must be greater than 0".to_string());
        }
        if self.server.reaper_interval_secs == 0 {
            return Err("reaper_interval_secs must be greater than 0".to_string());
        }

        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&self.server.password_hash_cost) {
            return Err(format!(
                "password_hash_cost must be within {MIN_HASH_COST}..={MAX_HASH_COST}, got {}",
                self.server.password_hash_cost
            ));
        }

        if !self.server.rooms.iter().any(|room| room.id == DEFAULT_ROOM_ID) {
            return Err(format!("A room with the default id {DEFAULT_ROOM_ID} must be configured"));
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {VALID_LOG_LEVELS:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.server.websocket_path, "/ws");
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.server.idle_timeout_secs, 30);
        assert_eq!(config.server.rooms.len(), 1);
        assert_eq!(config.server.rooms[0].id, DEFAULT_ROOM_ID);

        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_conversion_to_server_config() {
        let mut config = AppConfig::default();
        config.server.bind_address = "0.0.0.0:9100".to_string();
        config.server.idle_timeout_secs = 45;

        let server = config.to_server_config().unwrap();
        assert_eq!(server.bind_address.port(), 9100);
        assert_eq!(server.idle_timeout_secs, 45);
        assert_eq!(server.websocket_path, "/ws");
        assert!(server.validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AppConfig::default();
        config.server.bind_address = "invalid".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.websocket_path = "ws".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.idle_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.password_hash_cost = 40;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.rooms = vec![RoomTemplate {
            id: uuid::Uuid::from_u128(7),
            title: "Side".to_string(),
        }];
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file_writes_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert!(path.exists());

        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.server.rooms, config.server.rooms);
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
bind_address = "127.0.0.1:7000"
idle_timeout_secs = 10

[[server.rooms]]
id = "00000000-0000-0000-0000-000000000000"
title = "Tavern"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).await.unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:7000");
        assert_eq!(config.server.idle_timeout_secs, 10);
        assert_eq!(config.server.reaper_interval_secs, 30);
        assert_eq!(config.server.rooms[0].title, "Tavern");
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[server\nbind_address = 5").unwrap();
        assert!(AppConfig::load_from_file(file.path()).await.is_err());
    }
}
