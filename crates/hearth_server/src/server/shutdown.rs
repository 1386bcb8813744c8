//! Shutdown coordination for graceful server shutdown.
//!
//! This module provides shared shutdown state for coordinating graceful
//! shutdown across the accept loop, the idle reaper and the application.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Shared shutdown state for coordinating graceful shutdown across components.
#[derive(Debug, Clone)]
pub struct ShutdownState {
    /// Flag indicating shutdown has been initiated - no new connections are accepted
    shutdown_initiated: Arc<AtomicBool>,
    /// Flag indicating all sessions have been closed and final shutdown can begin
    shutdown_complete: Arc<AtomicBool>,
    /// Wakes tasks waiting in [`ShutdownState::wait_for_shutdown`]
    notifier: broadcast::Sender<()>,
}

impl ShutdownState {
    /// Creates a new shutdown state with both flags set to false.
    pub fn new() -> Self {
        let (notifier, _) = broadcast::channel(1);
        Self {
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            shutdown_complete: Arc::new(AtomicBool::new(false)),
            notifier,
        }
    }

    /// Returns true if shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }

    /// Returns true if shutdown is complete and final cleanup can begin.
    pub fn is_shutdown_complete(&self) -> bool {
        self.shutdown_complete.load(Ordering::Acquire)
    }

    /// Initiates shutdown and wakes every waiter. Repeated calls are harmless.
    pub fn initiate_shutdown(&self) {
        if !self.shutdown_initiated.swap(true, Ordering::AcqRel) {
            info!("🛑 Shutdown initiated - no new connections will be accepted");
        }
        let _ = self.notifier.send(());
    }

    /// Marks shutdown as complete - all sessions have been closed.
    pub fn complete_shutdown(&self) {
        self.shutdown_complete.store(true, Ordering::Release);
        info!("✅ All sessions closed - ready for final cleanup");
    }

    /// Resolves once shutdown has been initiated.
    pub async fn wait_for_shutdown(&self) {
        let mut receiver = self.notifier.subscribe();
        if self.is_shutdown_initiated() {
            return;
        }
        let _ = receiver.recv().await;
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn waiters_wake_on_initiate() {
        let state = ShutdownState::new();
        let waiter = {
            let state = state.clone();
            tokio::spawn(async move { state.wait_for_shutdown().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        state.initiate_shutdown();
        timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert!(state.is_shutdown_initiated());
        assert!(!state.is_shutdown_complete());
    }

    #[tokio::test]
    async fn late_waiters_return_immediately() {
        let state = ShutdownState::new();
        state.initiate_shutdown();
        timeout(Duration::from_millis(100), state.wait_for_shutdown())
            .await
            .unwrap();
    }
}
