//! Per-connection session state.

use crate::connection::ClientConnection;
use crate::messaging::Vector3i;
use crate::store::{Account, Character};
use crate::world::Room;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Default)]
struct SessionState {
    account: Option<Arc<Account>>,
    character: Option<Arc<Character>>,
    room: Option<Arc<Room>>,
    position: Vector3i,
}

/// Server-side state of one connected client.
///
/// A session moves from anonymous to logged in (account set) to playing
/// (character set) and may then be placed in a room. Account and character
/// are only assigned through the [`SessionRegistry`](super::SessionRegistry)
/// so its indices never disagree with the session. Each is assigned at most
/// once per session.
pub struct Session {
    id: Uuid,
    connection: ClientConnection,
    state: RwLock<SessionState>,
    ended: AtomicBool,
}

impl Session {
    pub fn new(connection: ClientConnection) -> Self {
        Self {
            id: Uuid::new_v4(),
            connection,
            state: RwLock::new(SessionState::default()),
            ended: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn connection(&self) -> &ClientConnection {
        &self.connection
    }

    pub fn account(&self) -> Option<Arc<Account>> {
        self.read().account.clone()
    }

    pub fn character(&self) -> Option<Arc<Character>> {
        self.read().character.clone()
    }

    /// Name shown to other players, if a character has been selected.
    pub fn character_name(&self) -> Option<String> {
        self.read().character.as_ref().map(|c| c.name.clone())
    }

    pub fn room(&self) -> Option<Arc<Room>> {
        self.read().room.clone()
    }

    /// Last position the client reported.
    pub fn position(&self) -> Vector3i {
        self.read().position
    }

    /// True once both account and character are set.
    pub fn is_playing(&self) -> bool {
        let state = self.read();
        state.account.is_some() && state.character.is_some()
    }

    /// Marks the session as ended.
    ///
    /// Returns `true` for the first caller only, which is then responsible
    /// for the end-of-session cleanup (room departure).
    pub fn end(&self) -> bool {
        !self.ended.swap(true, Ordering::AcqRel)
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    pub(crate) fn set_account(&self, account: Option<Arc<Account>>) {
        self.write().account = account;
    }

    pub(crate) fn set_character(&self, character: Option<Arc<Character>>) {
        self.write().character = character;
    }

    pub(crate) fn set_room(&self, room: Option<Arc<Room>>) {
        self.write().room = room;
    }

    /// Clears the room reference if it still points at `room`.
    pub(crate) fn clear_room_if(&self, room: &Room) {
        let mut state = self.write();
        if state.room.as_deref().is_some_and(|current| std::ptr::eq(current, room)) {
            state.room = None;
        }
    }

    pub(crate) fn set_position(&self, position: Vector3i) {
        self.write().position = position;
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("account", &state.account.as_ref().map(|a| &a.name))
            .field("character", &state.character.as_ref().map(|c| &c.name))
            .field("position", &state.position)
            .field("ended", &self.is_ended())
            .finish()
    }
}
