//! Player movement.

use crate::context::ServerContext;
use crate::error::SessionError;
use crate::messaging::ids::{incoming, outgoing};
use crate::messaging::{MessageBuffer, MessageHandler};
use crate::session::Session;
use async_trait::async_trait;
use std::sync::Arc;

/// Records the sender's new position and shows it to the rest of the room.
///
/// Body: position vector.
pub struct PlayerMoveHandler;

#[async_trait]
impl MessageHandler for PlayerMoveHandler {
    fn message_id(&self) -> u16 {
        incoming::PLAYER_MOVE
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

        let position = message.read_vector3i()?;
        let Some(room) = session.room() else {
            return Ok(true);
        };
        session.set_position(position);

        let name = session.character_name().unwrap_or_default();
        let moved = room.build(outgoing::OTHER_PLAYER_MOVE, |reply| {
            reply.write_string(&name)?;
            reply.write_vector3i(position)
        })
        .map_err(SessionError::Build)?;
        room.broadcast(&moved, Some(session)).await;
        Ok(true)
    }
}
