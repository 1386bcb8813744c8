//! # Hearth Server - Main Entry Point
//!
//! Parses the command line, loads the TOML configuration, sets up logging and
//! runs the session server until a termination signal arrives.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! hearth
//!
//! # Specify custom configuration
//! hearth --config production.toml
//!
//! # Override specific settings
//! hearth --bind 0.0.0.0:8080 --log-level debug --json-logs
//! ```
//!
//! If the configuration file doesn't exist, a default one is written to disk.
//!
//! ## Signal Handling
//!
//! SIGINT and SIGTERM start a graceful shutdown: the accept loop and the idle
//! reaper stop and every session is closed. A second signal exits at once.

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;
mod signals;

use app::Application;
use cli::CliArgs;

/// Runs the application.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging comes up before the application so configuration errors are visible.
    let mut config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();
    app::apply_overrides(&mut config, &args);

    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

pub use config::{AppConfig, LoggingSettings, ServerSettings};
