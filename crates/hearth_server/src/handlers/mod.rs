//! Built-in message handlers.
//!
//! Every handler is a stateless unit struct registered in the dispatch table
//! under its incoming message id. Names received from clients are lower-cased
//! before any lookup.

pub mod account;
pub mod character;
pub mod chat;
pub mod movement;
pub mod ping;

use crate::error::{DispatchError, SessionError};
use crate::messaging::ids::{STATUS_FAILURE, STATUS_SUCCESS};
use crate::messaging::DispatchTable;
use crate::session::Session;

pub use account::{AccountLoginHandler, AccountRegistrationHandler};
pub use character::{CharacterCreationHandler, CharacterListHandler, CharacterSelectionHandler};
pub use chat::ChatHandler;
pub use movement::PlayerMoveHandler;
pub use ping::PingHandler;

/// Longest accepted account or character name.
pub const MAX_NAME_LENGTH: usize = 16;

/// Builds the dispatch table with every built-in handler.
pub fn default_dispatch_table() -> Result<DispatchTable, DispatchError> {
    Ok(DispatchTable::builder()
        .register(AccountRegistrationHandler)?
        .register(AccountLoginHandler)?
        .register(ChatHandler)?
        .register(CharacterListHandler)?
        .register(CharacterCreationHandler)?
        .register(CharacterSelectionHandler)?
        .register(PingHandler)?
        .register(PlayerMoveHandler)?
        .build())
}

pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_NAME_LENGTH
}

pub(crate) async fn send_failure(session: &Session, id: u16, text: &str) -> Result<(), SessionError> {
    session
        .connection()
        .build_and_send(id, |message| {
            message.write_byte(STATUS_FAILURE)?;
            message.write_string(text)
        })
        .await
        .map_err(SessionError::Build)
}

pub(crate) async fn send_success(session: &Session, id: u16, text: Option<&str>) -> Result<(), SessionError> {
    session
        .connection()
        .build_and_send(id, |message| {
            message.write_byte(STATUS_SUCCESS)?;
            match text {
                Some(text) => message.write_string(text),
                None => Ok(()),
            }
        })
        .await
        .map_err(SessionError::Build)
}
