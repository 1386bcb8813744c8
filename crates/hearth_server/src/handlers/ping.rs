//! Keep-alive.

use crate::context::ServerContext;
use crate::error::SessionError;
use crate::messaging::ids::{incoming, outgoing};
use crate::messaging::{MessageBuffer, MessageHandler};
use crate::session::Session;
use async_trait::async_trait;
use std::sync::Arc;

/// Answers every ping with an empty pong. Allowed in any session state, so
/// clients can use it to stay clear of the idle reaper.
pub struct PingHandler;

#[async_trait]
impl MessageHandler for PingHandler {
    fn message_id(&self) -> u16 {
        incoming::PING
    }

    async fn handle(
        &self,
        _context: &ServerContext,
        session: &Arc<Session>,
        _message: &mut MessageBuffer,
    ) -> Result<bool, SessionError> {
        session.connection().build_and_send(outgoing::PONG, |_| Ok(()))
            .await
            .map_err(SessionError::Build)?;
        Ok(true)
    }
}
