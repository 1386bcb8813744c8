//! Error types and handling for the session server.
//!
//! This module defines the error types that can occur while decoding messages,
//! talking to a client socket, running a session and starting the server,
//! providing clear categorization of the different failure modes.

use tokio_tungstenite::tungstenite;

/// Errors raised by the binary message codec.
///
/// Every variant is a framing error: a message does not fit the wire format.
/// Whether that is the client's fault depends on the side it happened on, see
/// [`SessionError::Codec`] and [`SessionError::Build`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    /// A write would grow the message past its fixed capacity
    #[error("message overflow: {needed} bytes needed, {remaining} remaining")]
    Overflow { needed: usize, remaining: usize },

    /// A read would consume bytes past the populated region
    #[error("message underflow: {needed} bytes needed, {remaining} remaining")]
    Underflow { needed: usize, remaining: usize },

    /// A string length prefix was negative
    #[error("invalid string length: {0}")]
    InvalidLength(i32),

    /// Text outside the single-byte (ASCII) range
    #[error("only single-byte ASCII text is supported")]
    NonAscii,
}

/// Errors raised by a client connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The WebSocket transport failed (abrupt disconnect, protocol violation, ...)
    #[error("transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    /// The client sent a frame that does not fit into a message buffer
    #[error("frame of {0} bytes exceeds the message capacity")]
    Oversized(usize),
}

/// Errors raised by the account and character stores.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// An account or character with that name already exists
    #[error("name already in use: {0}")]
    NameTaken(String),

    /// The storage backend failed
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Errors raised while building the message dispatch table.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DispatchError {
    /// Two handlers declared the same message id
    #[error("duplicate handler registration for message id {0}")]
    DuplicateMessageId(u16),
}

/// Errors that terminate a session loop.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Malformed message body
    #[error("framing error: {0}")]
    Codec(#[from] CodecError),

    /// A reply or notice could not be built, e.g. a room snapshot outgrew one message
    #[error("failed to build outgoing message: {0}")]
    Build(CodecError),

    /// Socket level failure
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Account or character storage failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Password hashing failure
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// Anything else that went wrong while handling a message
    #[error("internal error: {0}")]
    Internal(String),
}

/// How loudly a session-ending error should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Expected, e.g. a client vanishing mid-read
    Expected,
    /// A buggy or malicious client
    Suspicious,
    /// A server side fault
    Unexpected,
}

impl SessionError {
    /// Classifies the error for logging by the session loop.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SessionError::Connection(ConnectionError::Transport(_)) => ErrorSeverity::Expected,
            SessionError::Connection(ConnectionError::Oversized(_)) | SessionError::Codec(_) => {
                ErrorSeverity::Suspicious
            }
            _ => ErrorSeverity::Unexpected,
        }
    }
}

/// Enumeration of possible server errors.
///
/// Separates failures to reach the network from invalid configuration.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Network-related errors such as binding failures or connection issues
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid server configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DispatchError> for ServerError {
    fn from(err: DispatchError) -> Self {
        ServerError::Config(err.to_string())
    }
}
