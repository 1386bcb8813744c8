//! Account registration and login.

use super::{is_valid_name, send_failure, send_success};
use crate::connection::CloseCode;
use crate::context::ServerContext;
use crate::error::{SessionError, StoreError};
use crate::messaging::ids::{incoming, outgoing};
use crate::messaging::{MessageBuffer, MessageHandler};
use crate::session::Session;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

const NAME_TAKEN: &str = "Account name already in use. Please choose a different name.";
const INVALID_NAME: &str = "Account name must be between 1 and 16 characters.";
const EMPTY_PASSWORD: &str = "Password must not be empty.";
const CREATED: &str = "Account created. You can now log in.";
const UNKNOWN_ACCOUNT: &str = "Account does not exist.";
const WRONG_PASSWORD: &str = "Wrong password.";
const IN_USE: &str = "Account already in use by another session.";

/// Creates an account, then closes the connection so the client logs in
/// on a fresh one.
///
/// Body: account name, password.
pub struct AccountRegistrationHandler;

#[async_trait]
impl MessageHandler for AccountRegistrationHandler {
    fn message_id(&self) -> u16 {
        incoming::ACCOUNT_REGISTRATION
    }

    async fn handle(
        &self,
        context: &ServerContext,
        session: &Arc<Session>,
        message: &mut MessageBuffer,
    ) -> Result<bool, SessionError> {
        let name = message.read_string()?.to_lowercase();
        let password = message.read_string()?;
        let reply = outgoing::ACCOUNT_REGISTRATION;

        if !is_valid_name(&name) {
            send_failure(session, reply, INVALID_NAME).await?;
            return Ok(false);
        }
        if password.is_empty() {
            send_failure(session, reply, EMPTY_PASSWORD).await?;
            return Ok(false);
        }
        if context.accounts().account_name_exists(&name).await? {
            send_failure(session, reply, NAME_TAKEN).await?;
            return Ok(false);
        }

        let hash = context.hasher().hash(&password).await?;
        match context.accounts().create_account(&name, &hash).await {
            Ok(account) => info!(session_id = %session.id(), "📝 Account '{}' registered ({})", account.name, account.id),
            Err(StoreError::NameTaken(_)) => {
                send_failure(session, reply, NAME_TAKEN).await?;
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        }

        send_success(session, reply, Some(CREATED)).await?;
        session.connection().close(CloseCode::Normal, "registration complete").await;
        Ok(true)
    }
}

/// Authenticates the session against an existing account.
///
/// Body: account name, password. An account can be held by one session at a
/// time; a second login is refused until the first session ends.
pub struct AccountLoginHandler;

#[async_trait]
impl MessageHandler for AccountLoginHandler {
    fn message_id(&self) -> u16 {
        incoming::ACCOUNT_LOGIN
    }

    async fn handle(
        &self,
        context: &ServerContext,
        session: &Arc<Session>,
        message: &mut MessageBuffer,
    ) -> Result<bool, SessionError> {
        let name = message.read_string()?.to_lowercase();
        let password = message.read_string()?;
        let reply = outgoing::ACCOUNT_LOGIN;

        let Some(account) = context.accounts().find_account_by_name(&name).await? else {
            send_failure(session, reply, UNKNOWN_ACCOUNT).await?;
            return Ok(false);
        };

        if !context.hasher().verify(&password, &account.password_hash).await? {
            send_failure(session, reply, WRONG_PASSWORD).await?;
            return Ok(false);
        }

        let account = Arc::new(account);
        if !context.sessions().claim_account(session, account.clone()) {
            send_failure(session, reply, IN_USE).await?;
            return Ok(false);
        }

        info!(session_id = %session.id(), "🔑 Account '{}' logged in", account.name);
        send_success(session, reply, None).await?;
        Ok(true)
    }
}
