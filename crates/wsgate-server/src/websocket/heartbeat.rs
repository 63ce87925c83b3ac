//! Heartbeat ping/idle liveness monitoring.

use std::sync::Arc;

use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use super::connection::ClientConnection;
use crate::config::HeartbeatConfig;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// Nothing was received from the client within the timeout window.
    TimedOut,
    /// The connection was closed by another path.
    Cancelled,
    /// A Ping frame could not be written.
    SendFailed,
}

/// Ping `connection` every `config.interval` until it closes or goes idle.
///
/// Any inbound frame counts as a sign of life (see
/// [`ClientConnection::mark_alive`]). The loop does not close the socket
/// itself; the caller decides what to do with the result.
pub async fn run_heartbeat(
    connection: Arc<ClientConnection>,
    config: HeartbeatConfig,
) -> HeartbeatResult {
    let mut ticker = time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick fires immediately.
    let _ = ticker.tick().await;

    loop {
        tokio::select! {
            () = connection.closed() => return HeartbeatResult::Cancelled,
            _ = ticker.tick() => {
                let idle = connection.idle_for();
                if idle >= config.timeout {
                    debug!(session_id = %connection.id, idle_secs = idle.as_secs(), "client idle past timeout");
                    return HeartbeatResult::TimedOut;
                }
                if connection.ping().await.is_err() {
                    return if connection.is_closed() {
                        HeartbeatResult::Cancelled
                    } else {
                        HeartbeatResult::SendFailed
                    };
                }
            }
        }
    }
}
