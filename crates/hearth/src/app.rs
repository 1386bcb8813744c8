//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that orchestrates server
//! startup, signal handling and graceful shutdown.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{wait_for_shutdown_signal, wait_for_signal},
};
use hearth_server::{SessionServer, ShutdownState};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{error, info, warn};

/// Upper bound on the time the server gets to close its sessions after a signal.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(8);

/// Main application struct.
///
/// Owns the merged configuration and the session server built from it.
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Session server instance
    server: Arc<SessionServer>,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Display startup banner
    /// 5. Build the session server
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;
        apply_overrides(&mut config, &args);

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let server = SessionServer::new(config.to_server_config()?)?;
        Ok(Self {
            config,
            server: Arc::new(server),
        })
    }

    /// Runs the server until a termination signal arrives, then shuts down.
    ///
    /// A second signal during shutdown exits the process immediately.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting Hearth server");
        self.log_configuration_summary();

        let shutdown = ShutdownState::new();

        let mut server_handle = {
            let server = self.server.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { server.start(shutdown).await })
        };

        info!("🛑 Press Ctrl+C to gracefully shutdown");

        tokio::select! {
            signal = wait_for_shutdown_signal(&shutdown) => signal?,
            finished = &mut server_handle => {
                // The server only returns on its own when it failed to start.
                return match finished {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e.into()),
                    Err(e) => Err(e.into()),
                };
            }
        }

        tokio::spawn(async move {
            if let Err(e) = wait_for_signal().await {
                error!("Failed to set up forced shutdown signal handler: {e}");
                return;
            }
            warn!("Shutdown signal received again, exiting immediately");
            std::process::exit(1);
        });

        info!("⏳ Waiting for the server to close all sessions...");
        match timeout(SHUTDOWN_TIMEOUT, server_handle).await {
            Ok(Ok(Ok(()))) => info!("✅ Server task completed gracefully"),
            Ok(Ok(Err(e))) => error!("❌ Server error during shutdown: {}", e),
            Ok(Err(e)) => error!("❌ Server task failed: {}", e),
            Err(_) => warn!("⏰ Server task did not complete within {:?}", SHUTDOWN_TIMEOUT),
        }
        shutdown.complete_shutdown();

        info!("✅ Hearth server shutdown complete");
        Ok(())
    }

    fn log_configuration_summary(&self) {
        let server = &self.config.server;
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}{}", server.bind_address, server.websocket_path);
        info!("  👥 Max connections: {}", server.max_connections);
        info!("  ⏱️ Idle timeout: {}s (sweep every {}s)", server.idle_timeout_secs, server.reaper_interval_secs);
        info!("  🏠 Rooms: {}", server.rooms.len());
    }
}

/// Applies command-line overrides on top of the file configuration.
pub(crate) fn apply_overrides(config: &mut AppConfig, args: &CliArgs) {
    if let Some(bind_address) = &args.bind_address {
        config.server.bind_address = bind_address.clone();
    }
    if let Some(log_level) = &args.log_level {
        config.logging.level = log_level.clone();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
}
