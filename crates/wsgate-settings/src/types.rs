//! Settings type definitions.
//!
//! Every section implements [`Default`] with production values and is marked
//! `#[serde(default)]`, so a settings file only needs the keys it overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings type for a gateway instance.
///
/// ```json
/// {
///   "server": { "port": 10000 },
///   "redis": { "host": "redis.internal", "port": 6379, "timeout": 30 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// HTTP/WebSocket listener settings.
    pub server: ServerSettings,
    /// Redis connection and session TTL.
    pub redis: RedisSettings,
    /// Which directory store backs the session directory.
    pub directory: DirectorySettings,
    /// Identity overrides for this instance.
    pub instance: InstanceSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
}

/// HTTP/WebSocket listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Interval between server-initiated Ping frames, in seconds. `0` disables the heartbeat.
    pub heartbeat_interval_secs: u64,
    /// Close a connection after this many seconds without a Pong or frame.
    pub heartbeat_timeout_secs: u64,
    /// Upper bound on closing live sockets during shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl ServerSettings {
    /// Heartbeat interval, or `None` when the heartbeat is disabled.
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_secs > 0).then(|| Duration::from_secs(self.heartbeat_interval_secs))
    }

    /// Heartbeat timeout.
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    /// Shutdown deadline.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10_000,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            shutdown_timeout_secs: 10,
            max_message_size: 1024 * 1024,
        }
    }
}

/// Redis connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    /// Redis host.
    pub host: String,
    /// Redis port.
    pub port: u16,
    /// Session record TTL in minutes.
    pub timeout: u64,
}

impl RedisSettings {
    /// Connection URL for the Redis client.
    pub fn url(&self) -> String {
        format!("redis://{}:{}/", self.host, self.port)
    }

    /// Session TTL as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.timeout * 60)
    }
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            timeout: 30,
        }
    }
}

/// Directory store backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryBackend {
    /// Shared Redis instance (multi-instance deployments).
    #[default]
    Redis,
    /// Process-local store (single instance, development).
    Memory,
}

/// Directory settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectorySettings {
    /// Backend used for session records.
    pub backend: DirectoryBackend,
}

/// Identity overrides for this instance.
///
/// When unset, the IP is discovered from the first private IPv4 interface
/// and the name is derived from `ip:port`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceSettings {
    /// Instance name used for ownership checks. Must be unique per instance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Advertised IP address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable compact lines.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive (overridden by `RUST_LOG`).
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}
