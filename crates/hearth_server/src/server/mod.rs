//! Core server implementation and connection handling.
//!
//! This module contains the session server, the per-connection upgrade
//! logic, the idle reaper and shutdown coordination.

pub mod core;
pub mod handlers;
pub mod reaper;
pub mod shutdown;

pub use core::SessionServer;
pub use reaper::IdleReaper;
pub use shutdown::ShutdownState;
