//! Room registry.

use super::room::{Room, RoomTemplate};
use crate::error::CodecError;
use crate::messaging::MessagePool;
use crate::session::Session;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Template id of the room every session enters after character selection.
pub const DEFAULT_ROOM_ID: Uuid = Uuid::nil();

/// Creates rooms on first use and looks them up by template id.
///
/// Rooms are never evicted; an empty room stays registered for the lifetime
/// of the process.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: DashMap<Uuid, Arc<Room>>,
    templates: HashMap<Uuid, RoomTemplate>,
    pool: MessagePool,
}

impl RoomRegistry {
    /// Creates a registry that knows the given templates.
    ///
    /// Rooms for unknown template ids can still be created; they simply have
    /// no template attached.
    pub fn new(templates: impl IntoIterator<Item = RoomTemplate>, pool: MessagePool) -> Self {
        Self {
            rooms: DashMap::new(),
            templates: templates.into_iter().map(|t| (t.id, t)).collect(),
            pool,
        }
    }

    /// Returns the room for `template_id`, creating it if needed.
    pub fn get_or_create(&self, template_id: Uuid) -> Arc<Room> {
        self.rooms
            .entry(template_id)
            .or_insert_with(|| {
                let template = self.templates.get(&template_id).cloned();
                let room = Room::new(template_id, template, self.pool.clone());
                info!(
                    "🏠 Created room {} for template {} ({})",
                    room.instance_id(),
                    template_id,
                    room.title()
                );
                Arc::new(room)
            })
            .value()
            .clone()
    }

    pub fn get(&self, template_id: Uuid) -> Option<Arc<Room>> {
        self.rooms.get(&template_id).map(|entry| entry.value().clone())
    }

    pub fn template(&self, template_id: Uuid) -> Option<&RoomTemplate> {
        self.templates.get(&template_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Moves `session` into the room for `template_id`, leaving its current
    /// room first.
    pub async fn join(&self, template_id: Uuid, session: &Arc<Session>) -> Result<Arc<Room>, CodecError> {
        let room = self.get_or_create(template_id);
        if let Some(current) = session.room() {
            if Arc::ptr_eq(&current, &room) {
                return Ok(room);
            }
            current.leave(session).await?;
        }
        room.join(session).await?;
        Ok(room)
    }

    /// Takes `session` out of whatever room it is in.
    pub async fn leave(&self, session: &Arc<Session>) -> Result<bool, CodecError> {
        match session.room() {
            Some(room) => room.leave(session).await,
            None => Ok(false),
        }
    }

    /// End-of-session cleanup: removes the session from its room.
    pub async fn session_ended(&self, session: &Arc<Session>) {
        if let Err(e) = self.leave(session).await {
            warn!(session_id = %session.id(), "Failed to notify room of departure: {}", e);
        }
    }
}
