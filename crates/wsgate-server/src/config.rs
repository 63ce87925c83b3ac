//! Server configuration.

use std::time::Duration;

use wsgate_settings::ServerSettings;

/// Ping cadence and the idle window after which a client is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Time between server Ping frames.
    pub interval: Duration,
    /// Close the connection when nothing was received for this long.
    pub timeout: Duration,
}

/// Runtime configuration for the gateway server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` picks a free port).
    pub port: u16,
    /// Client heartbeat; `None` disables pings and idle timeouts.
    pub heartbeat: Option<HeartbeatConfig>,
    /// Largest accepted inbound WebSocket message, in bytes.
    pub max_message_size: usize,
    /// Upper bound on graceful shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            heartbeat: Some(HeartbeatConfig {
                interval: Duration::from_secs(30),
                timeout: Duration::from_secs(90),
            }),
            max_message_size: 1024 * 1024,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&ServerSettings> for ServerConfig {
    fn from(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            heartbeat: settings.heartbeat_interval().map(|interval| HeartbeatConfig {
                interval,
                timeout: settings.heartbeat_timeout(),
            }),
            max_message_size: settings.max_message_size,
            shutdown_timeout: settings.shutdown_timeout(),
        }
    }
}
