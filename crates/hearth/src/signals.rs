//! Signal handling for graceful server shutdown.
//!
//! The first termination signal starts a graceful shutdown; the application
//! listens again afterwards so a second signal can force the process to exit.

use hearth_server::ShutdownState;
use tokio::signal;
use tracing::info;

/// Waits for a termination signal and marks `shutdown` as initiated.
///
/// Handles SIGINT and SIGTERM on Unix and Ctrl+C on Windows.
pub async fn wait_for_shutdown_signal(shutdown: &ShutdownState) -> std::io::Result<()> {
    wait_for_signal().await?;
    info!("📡 Received shutdown signal - initiating graceful shutdown");
    shutdown.initiate_shutdown();
    Ok(())
}

/// Waits for the next termination signal without touching any state.
pub async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    Ok(())
}
