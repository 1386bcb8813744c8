//! Rooms: broadcast groups of sessions sharing a location.

use crate::error::CodecError;
use crate::messaging::ids::outgoing;
use crate::messaging::{MessageBuffer, MessagePool, PooledMessage, Vector3i};
use crate::session::{Session, SessionRegistry};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Static description a room instance is created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomTemplate {
    pub id: Uuid,
    pub title: String,
}

/// A live room instance.
///
/// Occupants are tracked in a [`SessionRegistry`] of their own. Joining and
/// leaving notify the other occupants directly. Fan-out sends run
/// concurrently, so a failed or stalled send to one occupant never holds up
/// the others.
pub struct Room {
    instance_id: Uuid,
    template_id: Uuid,
    template: Option<RoomTemplate>,
    occupants: SessionRegistry,
    pool: MessagePool,
}

impl Room {
    pub fn new(template_id: Uuid, template: Option<RoomTemplate>, pool: MessagePool) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            template_id,
            template,
            occupants: SessionRegistry::new(),
            pool,
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn template_id(&self) -> Uuid {
        self.template_id
    }

    pub fn template(&self) -> Option<&RoomTemplate> {
        self.template.as_ref()
    }

    pub fn title(&self) -> &str {
        self.template.as_ref().map(|t| t.title.as_str()).unwrap_or("")
    }

    pub fn occupant_count(&self) -> usize {
        self.occupants.len()
    }

    pub fn contains(&self, session: &Session) -> bool {
        self.occupants.contains(session)
    }

    /// Current occupants, in no particular order.
    pub fn occupants(&self) -> Vec<Arc<Session>> {
        self.occupants.sessions()
    }

    /// Adds `session` to the room.
    ///
    /// The joiner receives a snapshot of every other occupant (name and last
    /// known position); every other occupant is told about the joiner, placed
    /// at the origin. Returns `Ok(false)` if the session was already inside.
    ///
    /// Fails without joining when the snapshot does not fit in one message
    /// (a crowded room); nobody is notified in that case.
    pub async fn join(self: &Arc<Self>, session: &Arc<Session>) -> Result<bool, CodecError> {
        if !self.occupants.add(session.clone()) {
            return Ok(false);
        }

        let others: Vec<Arc<Session>> = self
            .occupants
            .sessions()
            .into_iter()
            .filter(|other| !Arc::ptr_eq(other, session))
            .collect();

        let (snapshot, entered) = match self.entry_messages(session, &others) {
            Ok(messages) => messages,
            Err(e) => {
                self.occupants.remove(session);
                return Err(e);
            }
        };
        session.set_room(Some(self.clone()));

        session.connection().send(&snapshot).await;
        join_all(others.iter().map(|other| other.connection().send(&entered))).await;

        debug!(
            session_id = %session.id(),
            room = %self.instance_id,
            occupants = others.len() + 1,
            "Session joined room"
        );
        Ok(true)
    }

    /// Removes `session` from the room and tells everyone left behind.
    ///
    /// Returns `Ok(false)` if the session was not inside.
    pub async fn leave(&self, session: &Arc<Session>) -> Result<bool, CodecError> {
        if !self.occupants.remove(session) {
            return Ok(false);
        }
        session.clear_room_if(self);

        let remaining = self.occupants.sessions();
        if !remaining.is_empty() {
            let name = session.character_name().unwrap_or_default();
            let left = self.build(outgoing::OTHER_PLAYER_LEFT_ROOM, |message| message.write_string(&name))?;
            join_all(remaining.iter().map(|other| other.connection().send(&left))).await;
        }

        debug!(
            session_id = %session.id(),
            room = %self.instance_id,
            occupants = remaining.len(),
            "Session left room"
        );
        Ok(true)
    }

    /// Sends `message` to every occupant except `except`.
    pub async fn broadcast(&self, message: &MessageBuffer, except: Option<&Arc<Session>>) {
        let occupants = self.occupants.sessions();
        join_all(
            occupants
                .iter()
                .filter(|occupant| !except.is_some_and(|skip| Arc::ptr_eq(skip, occupant)))
                .map(|occupant| occupant.connection().send(message)),
        )
        .await;
    }

    /// The joiner's snapshot of `others` and the notice telling them about
    /// the joiner.
    fn entry_messages(
        &self,
        session: &Session,
        others: &[Arc<Session>],
    ) -> Result<(PooledMessage, PooledMessage), CodecError> {
        let snapshot = self.build(outgoing::SELF_ENTER_ROOM, |message| {
            let count = u16::try_from(others.len()).map_err(|_| CodecError::Overflow {
                needed: others.len(),
                remaining: usize::from(u16::MAX),
            })?;
            message.write_u16(count)?;
            for other in others {
                message.write_string(&other.character_name().unwrap_or_default())?;
                message.write_vector3i(other.position())?;
            }
            Ok(())
        })?;

        let name = session.character_name().unwrap_or_default();
        let entered = self.build(outgoing::OTHER_PLAYER_ENTER_ROOM, |message| {
            message.write_string(&name)?;
            message.write_vector3i(Vector3i::ZERO)
        })?;
        Ok((snapshot, entered))
    }

    /// Builds a message from the room's pool.
    pub fn build(
        &self,
        id: u16,
        populate: impl FnOnce(&mut MessageBuffer) -> Result<(), CodecError>,
    ) -> Result<PooledMessage, CodecError> {
        let mut message = self.pool.acquire();
        message.write_u16(id)?;
        populate(&mut message)?;
        Ok(message)
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("instance_id", &self.instance_id)
            .field("template_id", &self.template_id)
            .field("title", &self.title())
            .field("occupants", &self.occupants.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{account, assert_silent, character, cramped_session, recv, session, TestClient};
    use tokio::time::Duration;

    fn name_session(s: &Arc<Session>, name: &str) {
        let registry = SessionRegistry::new();
        let acc = account(name);
        assert!(registry.claim_account(s, acc.clone()));
        assert!(registry.claim_character(s, character(name, acc.id)));
    }

    async fn player(name: &str) -> (Arc<Session>, TestClient) {
        let (s, client) = session().await;
        name_session(&s, name);
        (s, client)
    }

    fn room() -> Arc<Room> {
        Arc::new(Room::new(Uuid::nil(), None, MessagePool::new()))
    }

    #[tokio::test]
    async fn first_joiner_gets_empty_snapshot() {
        let room = room();
        let (a, mut ca) = player("anna").await;

        assert!(room.join(&a).await.unwrap());
        assert!(a.room().is_some_and(|r| Arc::ptr_eq(&r, &room)));

        let mut snapshot = recv(&mut ca).await;
        assert_eq!(snapshot.read_u16().unwrap(), outgoing::SELF_ENTER_ROOM);
        assert_eq!(snapshot.read_u16().unwrap(), 0);
    }

    #[tokio::test]
    async fn second_joiner_sees_first_and_first_is_notified() {
        let room = room();
        let (a, mut ca) = player("anna").await;
        let (b, mut cb) = player("bert").await;
        a.set_position(Vector3i::new(4, 5, 6));

        room.join(&a).await.unwrap();
        recv(&mut ca).await;
        room.join(&b).await.unwrap();

        let mut snapshot = recv(&mut cb).await;
        assert_eq!(snapshot.read_u16().unwrap(), outgoing::SELF_ENTER_ROOM);
        assert_eq!(snapshot.read_u16().unwrap(), 1);
        assert_eq!(snapshot.read_string().unwrap(), "anna");
        assert_eq!(snapshot.read_vector3i().unwrap(), Vector3i::new(4, 5, 6));

        let mut entered = recv(&mut ca).await;
        assert_eq!(entered.read_u16().unwrap(), outgoing::OTHER_PLAYER_ENTER_ROOM);
        assert_eq!(entered.read_string().unwrap(), "bert");
        assert_eq!(entered.read_vector3i().unwrap(), Vector3i::ZERO);
    }

    #[tokio::test]
    async fn leaving_notifies_every_remaining_occupant() {
        let room = room();
        let (a, mut ca) = player("anna").await;
        let (b, mut cb) = player("bert").await;
        let (c, mut cc) = player("cleo").await;
        for s in [&a, &b, &c] {
            room.join(s).await.unwrap();
        }
        // Drain snapshots and enter notifications.
        recv(&mut ca).await;
        recv(&mut ca).await;
        recv(&mut ca).await;
        recv(&mut cb).await;
        recv(&mut cb).await;
        recv(&mut cc).await;

        assert!(room.leave(&a).await.unwrap());
        assert!(a.room().is_none());
        assert_eq!(room.occupant_count(), 2);

        for client in [&mut cb, &mut cc] {
            let mut left = recv(client).await;
            assert_eq!(left.read_u16().unwrap(), outgoing::OTHER_PLAYER_LEFT_ROOM);
            assert_eq!(left.read_string().unwrap(), "anna");
        }
        assert_silent(&mut ca).await;
    }

    #[tokio::test]
    async fn joining_twice_and_leaving_twice_are_no_ops() {
        let room = room();
        let (a, mut ca) = player("anna").await;

        assert!(room.join(&a).await.unwrap());
        assert!(!room.join(&a).await.unwrap());
        recv(&mut ca).await;
        assert_silent(&mut ca).await;

        assert!(room.leave(&a).await.unwrap());
        assert!(!room.leave(&a).await.unwrap());
        assert_eq!(room.occupant_count(), 0);
    }

    #[tokio::test]
    async fn stalled_occupant_does_not_hold_up_the_room() {
        let room = room();
        let (slow, _unread) = cramped_session().await;
        name_session(&slow, "slow");
        let (b, mut cb) = player("bert").await;

        room.join(&slow).await.unwrap();
        room.join(&b).await.unwrap();
        recv(&mut cb).await;

        let line = room
            .build(outgoing::CHAT, |m| {
                m.write_string("bert")?;
                m.write_string(&"x".repeat(480))
            })
            .unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            for _ in 0..8 {
                room.broadcast(&line, None).await;
            }
        })
        .await
        .expect("broadcasts must not wait on an occupant that stopped reading");

        assert!(!slow.connection().is_open());
        for _ in 0..8 {
            let mut chat = recv(&mut cb).await;
            assert_eq!(chat.read_u16().unwrap(), outgoing::CHAT);
        }
    }

    #[tokio::test]
    async fn snapshot_too_large_for_a_message_leaves_room_untouched() {
        let room = room();
        // Each entry takes 210 bytes, twenty of them exceed one message.
        let mut residents = Vec::new();
        for i in 0..20 {
            let (s, client) = player(&format!("{i:0>200}")).await;
            assert!(room.occupants.add(s.clone()));
            residents.push((s, client));
        }

        let (late, mut cl) = player("late").await;
        let err = room.join(&late).await.unwrap_err();
        assert!(matches!(err, CodecError::Overflow { .. }));

        assert!(!room.contains(&late));
        assert!(late.room().is_none());
        assert_eq!(room.occupant_count(), 20);
        assert_silent(&mut cl).await;
        for (_, client) in residents.iter_mut().take(3) {
            assert_silent(client).await;
        }
    }
}
