//! Message dispatch table.
//!
//! Maps the leading message id of every incoming message to the handler that
//! processes it. The table is built once at startup and is immutable after
//! that, so lookups from many session loops need no locking.

use crate::context::ServerContext;
use crate::error::{DispatchError, SessionError};
use crate::messaging::MessageBuffer;
use crate::session::Session;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Processes one kind of incoming message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// The id of the messages this handler accepts.
    fn message_id(&self) -> u16;

    /// Handles one message whose id has already been consumed.
    ///
    /// # Arguments
    ///
    /// * `context` - Shared server state (registries, stores, pool)
    /// * `session` - The session the message arrived on
    /// * `message` - The message, read cursor positioned after the id
    ///
    /// # Returns
    ///
    /// `Ok(true)` to keep the session running, `Ok(false)` to end it.
    async fn handle(
        &self,
        context: &ServerContext,
        session: &Arc<Session>,
        message: &mut MessageBuffer,
    ) -> Result<bool, SessionError>;
}

/// Immutable mapping from message id to handler.
#[derive(Default)]
pub struct DispatchTable {
    handlers: HashMap<u16, Arc<dyn MessageHandler>>,
}

impl DispatchTable {
    pub fn builder() -> DispatchTableBuilder {
        DispatchTableBuilder::default()
    }

    /// Looks up the handler for `message_id`.
    pub fn get(&self, message_id: u16) -> Option<&Arc<dyn MessageHandler>> {
        self.handlers.get(&message_id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered message ids in ascending order.
    pub fn message_ids(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self.handlers.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("message_ids", &self.message_ids())
            .finish()
    }
}

/// Collects handlers and rejects duplicate ids.
#[derive(Default)]
pub struct DispatchTableBuilder {
    handlers: HashMap<u16, Arc<dyn MessageHandler>>,
}

impl DispatchTableBuilder {
    /// Adds a handler under its own message id.
    ///
    /// # Errors
    ///
    /// [`DispatchError::DuplicateMessageId`] if another handler already claimed
    /// the id. Startup must abort in that case.
    pub fn register(mut self, handler: impl MessageHandler + 'static) -> Result<Self, DispatchError> {
        let id = handler.message_id();
        if self.handlers.contains_key(&id) {
            return Err(DispatchError::DuplicateMessageId(id));
        }
        self.handlers.insert(id, Arc::new(handler));
        Ok(self)
    }

    pub fn build(self) -> DispatchTable {
        DispatchTable {
            handlers: self.handlers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(u16);

    #[async_trait]
    impl MessageHandler for Fixed {
        fn message_id(&self) -> u16 {
            self.0
        }

        async fn handle(
            &self,
            _context: &ServerContext,
            _session: &Arc<Session>,
            _message: &mut MessageBuffer,
        ) -> Result<bool, SessionError> {
            Ok(true)
        }
    }

    #[test]
    fn lookup_by_id() {
        let table = DispatchTable::builder()
            .register(Fixed(3))
            .unwrap()
            .register(Fixed(1))
            .unwrap()
            .build();

        assert_eq!(table.len(), 2);
        assert_eq!(table.message_ids(), vec![1, 3]);
        assert_eq!(table.get(3).map(|h| h.message_id()), Some(3));
        assert!(table.get(2).is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = DispatchTable::builder()
            .register(Fixed(7))
            .unwrap()
            .register(Fixed(7));
        assert!(matches!(result, Err(DispatchError::DuplicateMessageId(7))));
    }
}
