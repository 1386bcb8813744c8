//! Character listing, creation and selection.

use super::{is_valid_name, send_failure, send_success};
use crate::context::ServerContext;
use crate::error::{SessionError, StoreError};
use crate::messaging::ids::{incoming, outgoing};
use crate::messaging::{MessageBuffer, MessageHandler};
use crate::session::Session;
use crate::world::DEFAULT_ROOM_ID;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

const NAME_TAKEN: &str = "Charactername already taken. Please try a different one.";
const INVALID_NAME: &str = "Character name must be between 1 and 16 characters.";

/// Date format of the creation date in character lists.
const CREATED_FORMAT: &str = "%Y-%m-%d";

/// Lists the characters of the logged in account.
///
/// Reply: count byte, then name and creation date per character. At most
/// 255 characters are listed.
pub struct CharacterListHandler;

#[async_trait]
impl MessageHandler for CharacterListHandler {
    fn message_id(&self) -> u16 {
        incoming::CHARACTER_LIST
    }

    async fn handle(
        &self,
        context: &ServerContext,
        session: &Arc<Session>,
        _message: &mut MessageBuffer,
    ) -> Result<bool, SessionError> {
        let Some(account) = session.account() else {
            return Ok(false);
        };

        let characters = context.characters().list_characters_for_account(account.id).await?;
        let listed = &characters[..characters.len().min(usize::from(u8::MAX))];

        session
            .connection()
            .build_and_send(outgoing::CHARACTER_LIST, |reply| {
                reply.write_byte(u8::try_from(listed.len()).unwrap_or(u8::MAX))?;
                for character in listed {
                    reply.write_string(&character.name)?;
                    reply.write_string(&character.created_at.format(CREATED_FORMAT).to_string())?;
                }
                Ok(())
            })
            .await
            .map_err(SessionError::Build)?;
        Ok(true)
    }
}

/// Creates a character for the logged in account.
///
/// Body: character name. Only allowed before a character is selected.
pub struct CharacterCreationHandler;

#[async_trait]
impl MessageHandler for CharacterCreationHandler {
    fn message_id(&self) -> u16 {
        incoming::CHARACTER_CREATION
    }

    async fn handle(
        &self,
        context: &ServerContext,
        session: &Arc<Session>,
        message: &mut MessageBuffer,
    ) -> Result<bool, SessionError> {
        let Some(account) = session.account() else {
            return Ok(false);
        };
        if session.character().is_some() {
            return Ok(false);
        }

        let name = message.read_string()?.to_lowercase();
        let reply = outgoing::CHARACTER_CREATION;

        if !is_valid_name(&name) {
            send_failure(session, reply, INVALID_NAME).await?;
            return Ok(true);
        }
        if context.characters().character_name_exists(&name).await? {
            send_failure(session, reply, NAME_TAKEN).await?;
            return Ok(true);
        }

        match context.characters().create_character(&name, account.id).await {
            Ok(character) => {
                info!(session_id = %session.id(), "🧙 Character '{}' created for '{}'", character.name, account.name);
                send_success(session, reply, None).await?;
            }
            Err(StoreError::NameTaken(_)) => send_failure(session, reply, NAME_TAKEN).await?,
            Err(e) => return Err(e.into()),
        }
        Ok(true)
    }
}

/// Selects one of the account's characters and enters the default room.
///
/// Body: character name. Selecting a character that does not exist or
/// belongs to another account ends the session.
pub struct CharacterSelectionHandler;

#[async_trait]
impl MessageHandler for CharacterSelectionHandler {
    fn message_id(&self) -> u16 {
        incoming::CHARACTER_SELECTION
    }

    async fn handle(
        &self,
        context: &ServerContext,
        session: &Arc<Session>,
        message: &mut MessageBuffer,
    ) -> Result<bool, SessionError> {
        let Some(account) = session.account() else {
            return Ok(false);
        };
        if session.character().is_some() {
            return Ok(false);
        }

        let name = message.read_string()?.to_lowercase();
        let character = match context.characters().find_character_by_name(&name).await? {
            Some(character) if character.account_id == account.id => Arc::new(character),
            _ => {
                debug!(session_id = %session.id(), "Selection of unknown or foreign character '{}'", name);
                return Ok(false);
            }
        };

        if !context.sessions().claim_character(session, character.clone()) {
            return Ok(false);
        }

        send_success(session, outgoing::CHARACTER_SELECTION, None).await?;
        context
            .rooms()
            .join(DEFAULT_ROOM_ID, session)
            .await
            .map_err(SessionError::Build)?;
        info!(session_id = %session.id(), "🎮 '{}' entered the world", character.name);
        Ok(true)
    }
}
