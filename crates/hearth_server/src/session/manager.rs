//! The per-connection session loop.
//!
//! One loop runs per connected client: it registers the session, reads
//! messages strictly in arrival order, dispatches each to its handler and
//! finally tears everything down. Whatever ends the loop (clean close,
//! unknown message, handler rejection, error), cleanup runs exactly once.

use super::Session;
use crate::connection::{ClientConnection, CloseCode};
use crate::context::ServerContext;
use crate::error::{ConnectionError, ErrorSeverity, SessionError};
use crate::messaging::{DispatchTable, MessageBuffer};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Why a session loop stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The transport closed (peer, reaper or server)
    Closed,
    /// The client sent an id no handler is registered for
    UnknownMessage(u16),
    /// A handler asked for the session to end
    Rejected(u16),
}

/// Runs session loops against a shared context and dispatch table.
#[derive(Debug, Clone)]
pub struct SessionManager {
    context: Arc<ServerContext>,
    dispatch: Arc<DispatchTable>,
}

impl SessionManager {
    pub fn new(context: Arc<ServerContext>, dispatch: Arc<DispatchTable>) -> Self {
        Self { context, dispatch }
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.context
    }

    pub fn dispatch(&self) -> &Arc<DispatchTable> {
        &self.dispatch
    }

    /// Wraps `connection` in a new session and runs it to completion.
    pub async fn handle_client(&self, connection: ClientConnection) {
        let session = Arc::new(Session::new(connection));
        self.run(session).await;
    }

    /// Runs the loop for an already created session.
    ///
    /// Returns once the session has been deregistered, its connection closed
    /// and its room membership released.
    pub async fn run(&self, session: Arc<Session>) {
        if !self.context.sessions().add(session.clone()) {
            error!(session_id = %session.id(), "Session id already registered");
            session.connection().close(CloseCode::Error, "duplicate session").await;
            return;
        }
        debug!(
            session_id = %session.id(),
            remote_addr = ?session.connection().remote_addr(),
            "Session started"
        );

        let mut message = self.context.pool().acquire();
        let close_code = match self.dispatch_loop(&session, &mut message).await {
            Ok(LoopExit::Closed) => {
                debug!(session_id = %session.id(), "Connection closed");
                CloseCode::Normal
            }
            Ok(LoopExit::UnknownMessage(id)) => {
                info!(session_id = %session.id(), message_id = id, "Unknown message id, ending session");
                CloseCode::Policy
            }
            Ok(LoopExit::Rejected(id)) => {
                debug!(session_id = %session.id(), message_id = id, "Handler ended session");
                CloseCode::Normal
            }
            Err(e) => Self::report(&session, &e),
        };

        self.context.sessions().remove(&session);
        session.connection().close(close_code, "").await;
        if session.end() {
            self.context.rooms().session_ended(&session).await;
        }
        drop(message);

        debug!(session_id = %session.id(), "Session ended");
    }

    async fn dispatch_loop(&self, session: &Arc<Session>, message: &mut MessageBuffer) -> Result<LoopExit, SessionError> {
        loop {
            if !session.connection().read_message(message).await? {
                return Ok(LoopExit::Closed);
            }

            let id = message.read_u16()?;
            let Some(handler) = self.dispatch.get(id) else {
                return Ok(LoopExit::UnknownMessage(id));
            };

            trace!(session_id = %session.id(), message_id = id, "Dispatching message");
            if !handler.handle(&self.context, session, message).await? {
                return Ok(LoopExit::Rejected(id));
            }
        }
    }

    /// Logs a loop-ending error at a level matching its cause and picks the
    /// close code to send.
    fn report(session: &Session, err: &SessionError) -> CloseCode {
        match err.severity() {
            ErrorSeverity::Expected => {
                info!(session_id = %session.id(), "Transport error: {}", err);
                CloseCode::Normal
            }
            ErrorSeverity::Suspicious => {
                warn!(session_id = %session.id(), "Malformed message: {}", err);
                match err {
                    SessionError::Connection(ConnectionError::Oversized(_)) => CloseCode::Size,
                    _ => CloseCode::Protocol,
                }
            }
            ErrorSeverity::Unexpected => {
                error!(session_id = %session.id(), "Session failed: {}", err);
                CloseCode::Error
            }
        }
    }
}
