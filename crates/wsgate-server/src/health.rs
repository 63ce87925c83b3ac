//! `/health` endpoint.

use serde::Serialize;
use tokio::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the server is running.
    pub status: String,
    /// Name of this instance.
    pub instance: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Live WebSocket client connections.
    pub connections: usize,
}

/// Build a health response from live counters.
pub fn health_check(instance: &str, start_time: Instant, connections: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        instance: instance.to_string(),
        uptime_secs: start_time.elapsed().as_secs(),
        connections,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn status_is_ok() {
        let resp = health_check("gw-a", Instant::now(), 0);
        assert_eq!(resp.status, "ok");
        assert_eq!(resp.instance, "gw-a");
    }

    #[tokio::test(start_paused = true)]
    async fn uptime_tracks_clock() {
        let start = Instant::now();
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(health_check("gw-a", start, 0).uptime_secs, 60);
    }

    #[test]
    fn serialization() {
        let resp = health_check("gw-a", Instant::now(), 2);
        let parsed = serde_json::to_value(&resp).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["instance"], "gw-a");
        assert_eq!(parsed["connections"], 2);
        assert!(parsed["uptime_secs"].is_number());
    }
}
