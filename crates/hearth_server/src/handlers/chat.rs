//! Room chat.

use crate::context::ServerContext;
use crate::error::SessionError;
use crate::messaging::ids::{incoming, outgoing};
use crate::messaging::{MessageBuffer, MessageHandler};
use crate::session::Session;
use async_trait::async_trait;
use std::sync::Arc;

/// Relays a chat line to everyone in the sender's room, sender included.
///
/// Body: text. Chatting outside a room is accepted and does nothing.
pub struct ChatHandler;

#[async_trait]
impl MessageHandler for ChatHandler {
    fn message_id(&self) -> u16 {
        incoming::CHAT
    }

    async fn handle(
        &self,
        _context: &ServerContext,
        session: &Arc<Session>,
        message: &mut MessageBuffer,
    ) -> Result<bool, SessionError> {
        if !session.is_playing() {
            return Ok(false);
        }

        let text = message.read_string()?;
        let Some(room) = session.room() else {
            return Ok(true);
        };

        let name = session.character_name().unwrap_or_default();
        let line = room.build(outgoing::CHAT, |reply| {
            reply.write_string(&name)?;
            reply.write_string(&text)
        })?; // a line too long to relay is the sender's framing fault
        room.broadcast(&line, None).await;
        Ok(true)
    }
}
