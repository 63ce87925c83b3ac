//! Session ownership record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::instance::Instance;

/// The unit stored in the directory: which instance holds a session's socket.
///
/// Only the expiry of a stored record ever changes; identity and ownership
/// fields are fixed at creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Globally unique session id (UUID v4).
    pub session_id: String,
    /// Instance that accepted the socket.
    #[serde(rename = "instance")]
    pub owning_instance: Instance,
    /// When the socket was accepted.
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Create a record owned by `instance`, timestamped now.
    pub fn new(session_id: impl Into<String>, instance: Instance) -> Self {
        Self {
            session_id: session_id.into(),
            owning_instance: instance,
            created_at: Utc::now(),
        }
    }

    /// Whether `instance` owns this session.
    pub fn is_owned_by(&self, instance: &Instance) -> bool {
        self.owning_instance.name == instance.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_field_names() {
        let record = SessionRecord::new("s1", Instance::new("gw-a", "10.0.0.5", 10_000));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["session_id"], "s1");
        assert_eq!(json["instance"]["name"], "gw-a");
        assert!(json["created_at"].is_string());
        assert!(json.get("owning_instance").is_none());
    }

    #[test]
    fn ownership_compares_names_only() {
        let record = SessionRecord::new("s1", Instance::new("gw-a", "10.0.0.5", 10_000));
        assert!(record.is_owned_by(&Instance::new("gw-a", "10.0.0.9", 1)));
        assert!(!record.is_owned_by(&Instance::new("gw-b", "10.0.0.5", 10_000)));
    }

    #[test]
    fn parses_stored_value() {
        let raw = r#"{"session_id":"s2","instance":{"name":"n","ip":"10.1.1.1","port":80},"created_at":"2025-01-02T03:04:05Z"}"#;
        let record: SessionRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.session_id, "s2");
        assert_eq!(record.owning_instance.port, 80);
        assert_eq!(record.created_at.to_rfc3339(), "2025-01-02T03:04:05+00:00");
    }
}
