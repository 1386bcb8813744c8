//! Binary messaging between clients and the server.
//!
//! This module provides the wire codec, the buffer pool, the message id
//! catalogue and the table that dispatches incoming messages to handlers.

pub mod codec;
pub mod dispatch;
pub mod ids;
pub mod pool;

pub use codec::{MessageBuffer, Vector3i, MESSAGE_CAPACITY};
pub use dispatch::{DispatchTable, DispatchTableBuilder, MessageHandler};
pub use pool::{MessagePool, PooledMessage};
