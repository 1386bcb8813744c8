//! Log output for the server process.
//!
//! Session loops, the accept loop and the idle reaper all report through
//! `tracing`. This module installs the subscriber that writes those events to
//! stdout, colored for a terminal or as JSON objects for a log collector.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Shape of each emitted log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact colored lines
    Terminal,
    /// One JSON object per event, event fields at the top level
    Json,
}

impl LogFormat {
    /// `--json-logs` switches to JSON even when the file asks for terminal output.
    pub fn resolve(config: &LoggingSettings, force_json: bool) -> Self {
        if force_json || config.json_format {
            LogFormat::Json
        } else {
            LogFormat::Terminal
        }
    }
}

/// `RUST_LOG` when it is set and parses, the configured level otherwise.
///
/// Directives such as `hearth_server::session=trace` narrow output to the
/// session loop without raising the level everywhere.
fn event_filter(level: &str) -> Result<EnvFilter, ParseError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level),
    }
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn setup_logging(config: &LoggingSettings, json_format: bool) -> Result<(), Box<dyn std::error::Error>> {
    let format = LogFormat::resolve(config, json_format);
    let filter = event_filter(&config.level)?;

    let output = fmt::layer().with_target(true).with_thread_names(true);
    let output = match format {
        LogFormat::Json => output.json().flatten_event(true).boxed(),
        LogFormat::Terminal => output.with_ansi(true).compact().boxed(),
    };

    tracing_subscriber::registry().with(filter).with(output).try_init()?;

    info!(level = %config.level, ?format, "🔧 Logging ready");
    Ok(())
}

/// Displays the startup banner through the logger.
pub fn display_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("╔══════════════════════════════════════════╗");
    info!("║              🔥 HEARTH SERVER 🔥          ║");
    info!("║                 v{:<24}║", version);
    info!("║                                          ║");
    info!("║  Sessions, rooms and real-time messaging ║");
    info!("║  over WebSocket                          ║");
    info!("╚══════════════════════════════════════════╝");
}
