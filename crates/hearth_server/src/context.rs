//! Shared server state handed to every message handler.

use crate::messaging::MessagePool;
use crate::security::{BcryptHasher, PasswordHasher};
use crate::session::SessionRegistry;
use crate::store::{AccountStore, CharacterStore, InMemoryStore};
use crate::world::{RoomRegistry, RoomTemplate};
use std::sync::Arc;

/// Everything a handler may touch besides its own session.
pub struct ServerContext {
    sessions: SessionRegistry,
    rooms: RoomRegistry,
    pool: MessagePool,
    accounts: Arc<dyn AccountStore>,
    characters: Arc<dyn CharacterStore>,
    hasher: Arc<dyn PasswordHasher>,
}

impl ServerContext {
    /// Creates a context with its own session registry, room registry and
    /// buffer pool on top of the given collaborators.
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        characters: Arc<dyn CharacterStore>,
        hasher: Arc<dyn PasswordHasher>,
        room_templates: impl IntoIterator<Item = RoomTemplate>,
    ) -> Self {
        let pool = MessagePool::new();
        Self {
            sessions: SessionRegistry::new(),
            rooms: RoomRegistry::new(room_templates, pool.clone()),
            pool,
            accounts,
            characters,
            hasher,
        }
    }

    /// A context backed by a fresh [`InMemoryStore`] and bcrypt at `hash_cost`.
    pub fn in_memory(hash_cost: u32, room_templates: impl IntoIterator<Item = RoomTemplate>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::new(
            store.clone(),
            store,
            Arc::new(BcryptHasher::new(hash_cost)),
            room_templates,
        )
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn pool(&self) -> &MessagePool {
        &self.pool
    }

    pub fn accounts(&self) -> &dyn AccountStore {
        self.accounts.as_ref()
    }

    pub fn characters(&self) -> &dyn CharacterStore {
        self.characters.as_ref()
    }

    pub fn hasher(&self) -> &dyn PasswordHasher {
        self.hasher.as_ref()
    }
}

impl std::fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerContext")
            .field("sessions", &self.sessions.len())
            .field("rooms", &self.rooms.room_count())
            .field("pool", &self.pool)
            .finish()
    }
}
