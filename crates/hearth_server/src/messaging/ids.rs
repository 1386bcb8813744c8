//! Wire message ids.
//!
//! Incoming and outgoing ids are numbered independently.

/// Ids of messages sent by clients.
pub mod incoming {
    pub const ACCOUNT_REGISTRATION: u16 = 1;
    pub const ACCOUNT_LOGIN: u16 = 2;
    pub const CHAT: u16 = 3;
    pub const CHARACTER_LIST: u16 = 4;
    pub const CHARACTER_CREATION: u16 = 5;
    pub const CHARACTER_SELECTION: u16 = 6;
    pub const PING: u16 = 7;
    pub const PLAYER_MOVE: u16 = 8;
}

/// Ids of messages sent by the server.
pub mod outgoing {
    pub const ACCOUNT_REGISTRATION: u16 = 1;
    pub const ACCOUNT_LOGIN: u16 = 2;
    pub const CHAT: u16 = 3;
    pub const CHARACTER_LIST: u16 = 4;
    pub const CHARACTER_CREATION: u16 = 5;
    pub const CHARACTER_SELECTION: u16 = 6;
    pub const PONG: u16 = 7;
    /// Room snapshot sent to the joining session
    pub const SELF_ENTER_ROOM: u16 = 8;
    pub const OTHER_PLAYER_ENTER_ROOM: u16 = 9;
    pub const OTHER_PLAYER_LEFT_ROOM: u16 = 10;
    pub const OTHER_PLAYER_MOVE: u16 = 11;
}

/// Reply status byte for failed requests.
pub const STATUS_FAILURE: u8 = 0;
/// Reply status byte for successful requests.
pub const STATUS_SUCCESS: u8 = 1;
