//! Rooms and the registry that owns them.

pub mod manager;
pub mod room;

pub use manager::{RoomRegistry, DEFAULT_ROOM_ID};
pub use room::{Room, RoomTemplate};
