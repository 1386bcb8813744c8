//! Concurrent multi-key index over live sessions.
//!
//! Sessions are indexed by session id, and additionally by account id and
//! character id once those are set. The auxiliary indices are maintained by
//! [`SessionRegistry::claim_account`] and [`SessionRegistry::claim_character`],
//! which change the session field and the index entry while holding that
//! entry's lock. A session therefore appears in the account index exactly when
//! its account is set (same for characters), and two sessions racing for the
//! same account cannot both win.

use super::Session;
use crate::store::{Account, Character};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Default)]
struct RegistryInner {
    by_session: DashMap<Uuid, Arc<Session>>,
    by_account: DashMap<Uuid, Arc<Session>>,
    by_character: DashMap<Uuid, Arc<Session>>,
}

/// Index of sessions. Cheap to clone; clones share the same maps.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session.
    ///
    /// Returns `false` if a session with the same id is already present. An
    /// account or character already set on the session is indexed as well.
    pub fn add(&self, session: Arc<Session>) -> bool {
        match self.inner.by_session.entry(session.id()) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
            }
        }

        if let Some(account) = session.account() {
            self.inner.by_account.insert(account.id, session.clone());
        }
        if let Some(character) = session.character() {
            self.inner.by_character.insert(character.id, session);
        }
        true
    }

    /// Removes a session from every index.
    ///
    /// Index entries are only removed while they still point at this session.
    /// Returns `true` if the session was registered.
    pub fn remove(&self, session: &Arc<Session>) -> bool {
        if self
            .inner
            .by_session
            .remove_if(&session.id(), |_, current| Arc::ptr_eq(current, session))
            .is_none()
        {
            return false;
        }

        if let Some(account) = session.account() {
            self.inner
                .by_account
                .remove_if(&account.id, |_, current| Arc::ptr_eq(current, session));
        }
        if let Some(character) = session.character() {
            self.inner
                .by_character
                .remove_if(&character.id, |_, current| Arc::ptr_eq(current, session));
        }
        true
    }

    /// Assigns `account` to `session` and indexes it.
    ///
    /// Fails (returns `false`) if another session already holds the account or
    /// this session already has an account.
    pub fn claim_account(&self, session: &Arc<Session>, account: Arc<Account>) -> bool {
        if session.account().is_some() {
            return false;
        }

        match self.inner.by_account.entry(account.id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                session.set_account(Some(account));
                slot.insert(session.clone());
                true
            }
        }
    }

    /// Assigns `character` to `session` and indexes it.
    ///
    /// Requires the session to have an account and no character yet; fails if
    /// another session already plays the character.
    pub fn claim_character(&self, session: &Arc<Session>, character: Arc<Character>) -> bool {
        if session.account().is_none() || session.character().is_some() {
            return false;
        }

        match self.inner.by_character.entry(character.id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                session.set_character(Some(character));
                slot.insert(session.clone());
                true
            }
        }
    }

    pub fn get_by_session_id(&self, id: Uuid) -> Option<Arc<Session>> {
        self.inner.by_session.get(&id).map(|entry| entry.value().clone())
    }

    pub fn get_by_account_id(&self, id: Uuid) -> Option<Arc<Session>> {
        self.inner.by_account.get(&id).map(|entry| entry.value().clone())
    }

    pub fn get_by_character_id(&self, id: Uuid) -> Option<Arc<Session>> {
        self.inner.by_character.get(&id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, session: &Session) -> bool {
        self.inner.by_session.contains_key(&session.id())
    }

    /// Snapshot of all registered sessions, in no particular order.
    ///
    /// No map lock is held once this returns, so callers may await while
    /// iterating the result.
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        self.inner
            .by_session
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.by_session.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.by_session.is_empty()
    }

    pub fn account_count(&self) -> usize {
        self.inner.by_account.len()
    }

    pub fn character_count(&self) -> usize {
        self.inner.by_character.len()
    }
}
