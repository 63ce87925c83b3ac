//! Session directory: record shape, key namespace, and TTL policy over a
//! [`DirectoryStore`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::errors::{DirectoryError, Result};
use crate::instance::Instance;
use crate::record::SessionRecord;
use crate::store::DirectoryStore;

/// Directory key for a session.
pub fn session_key(session_id: &str) -> String {
    format!("session:{session_id}")
}

/// Publishes and resolves session ownership for this instance.
pub struct SessionDirectory {
    instance: Instance,
    store: Arc<dyn DirectoryStore>,
    ttl: Duration,
}

impl SessionDirectory {
    /// Create a directory for `instance` over `store`; records live for `ttl`.
    pub fn new(instance: Instance, store: Arc<dyn DirectoryStore>, ttl: Duration) -> Self {
        Self {
            instance,
            store,
            ttl,
        }
    }

    /// Identity of this instance.
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Publish a new record for `session_id` owned by this instance.
    pub async fn add_session(&self, session_id: &str) -> Result<SessionRecord> {
        let record = SessionRecord::new(session_id, self.instance.clone());
        self.put(session_id, &record).await?;
        Ok(record)
    }

    /// Write `record` under `session_id`, replacing any previous record.
    #[instrument(skip(self, record), fields(owner = %record.owning_instance.name))]
    pub async fn put(&self, session_id: &str, record: &SessionRecord) -> Result<()> {
        let value = serde_json::to_string(record)?;
        self.store
            .set(&session_key(session_id), value, self.ttl)
            .await?;
        debug!(session_id, "session record stored");
        Ok(())
    }

    /// Fetch the record for `session_id`.
    pub async fn get(&self, session_id: &str) -> Result<SessionRecord> {
        match self.store.get(&session_key(session_id)).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Err(DirectoryError::NotFound {
                session_id: session_id.to_string(),
            }),
        }
    }

    /// Reset the record's expiry to the full TTL, leaving its value untouched.
    pub async fn refresh(&self, session_id: &str) -> Result<()> {
        let existed = self.store.expire(&session_key(session_id), self.ttl).await?;
        if !existed {
            debug!(session_id, "refresh skipped, record already gone");
        }
        Ok(())
    }

    /// Remove the record. Removing an absent record succeeds.
    pub async fn delete(&self, session_id: &str) -> Result<()> {
        self.store.delete(&session_key(session_id)).await?;
        debug!(session_id, "session record deleted");
        Ok(())
    }

    /// Time left before the record expires, if it exists.
    pub async fn expires_in(&self, session_id: &str) -> Result<Option<Duration>> {
        self.store.ttl(&session_key(session_id)).await
    }
}
