//! # wsgate-server
//!
//! Axum HTTP + `WebSocket` gateway for one instance.
//!
//! - `WebSocket` client sessions: id minting, registry, heartbeat, teardown
//! - Ownership-aware delivery backed by the shared session directory
//! - Relay streams, REST delivery, and session lookup endpoints
//! - Health and Prometheus metrics endpoints
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod gateway;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::{HeartbeatConfig, ServerConfig};
pub use errors::{GatewayError, RegistryError, SocketError};
pub use gateway::Gateway;
pub use server::GatewayServer;
