//! WebSocket connection handles, registry, heartbeat, and session tasks.

pub mod connection;
pub mod heartbeat;
pub mod registry;
pub mod session;
