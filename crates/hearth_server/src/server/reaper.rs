//! Idle connection reaper.
//!
//! Periodically closes connections whose client has not sent anything for
//! longer than the idle timeout. The reaper only closes; the session loop
//! wakes up on the closed connection and performs the usual cleanup, so the
//! registry is never touched from here.

use super::shutdown::ShutdownState;
use crate::connection::CloseCode;
use crate::session::SessionRegistry;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Background sweep over a session registry.
#[derive(Debug, Clone)]
pub struct IdleReaper {
    sessions: SessionRegistry,
    timeout: Duration,
    interval: Duration,
}

impl IdleReaper {
    pub fn new(sessions: SessionRegistry, timeout: Duration, interval: Duration) -> Self {
        Self {
            sessions,
            timeout,
            interval,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Closes every connection idle for longer than the timeout as of `now`.
    ///
    /// Returns the number of connections closed by this sweep.
    pub async fn sweep(&self, now: Instant) -> usize {
        let idle: Vec<_> = self
            .sessions
            .sessions()
            .into_iter()
            .filter(|session| session.connection().is_open())
            .filter(|session| session.connection().idle_for(now) > self.timeout)
            .collect();

        for session in &idle {
            info!(
                session_id = %session.id(),
                idle_secs = session.connection().idle_for(now).as_secs(),
                "⏰ Closing idle connection"
            );
        }

        join_all(
            idle.iter()
                .map(|session| session.connection().close(CloseCode::Away, "idle timeout")),
        )
        .await;

        idle.len()
    }

    /// Runs sweeps every interval until shutdown is initiated.
    pub fn spawn(self, shutdown: ShutdownState) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            let stop = shutdown.wait_for_shutdown();
            tokio::pin!(stop);

            loop {
                tokio::select! {
                    _ = &mut stop => {
                        debug!("Idle reaper stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let closed = self.sweep(Instant::now()).await;
                        if closed > 0 {
                            debug!("Idle sweep closed {} connection(s)", closed);
                        }
                    }
                }
            }
        })
    }
}
