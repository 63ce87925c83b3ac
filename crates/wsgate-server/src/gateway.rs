//! Ownership-aware delivery over the registry and the session directory.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, instrument, warn};
use wsgate_directory::{Instance, SessionDirectory, SessionRecord};

use crate::errors::{GatewayError, SocketError};
use crate::metrics::{DELIVERY_FAILURES_TOTAL, MESSAGES_DELIVERED_TOTAL};
use crate::websocket::connection::ClientConnection;
use crate::websocket::registry::ConnectionRegistry;

/// Protocol operations shared by every HTTP and WebSocket handler.
///
/// Sessions are never forwarded between instances: a session owned by
/// another instance is rejected with [`GatewayError::OwnershipMismatch`].
pub struct Gateway {
    registry: ConnectionRegistry,
    directory: SessionDirectory,
}

impl Gateway {
    /// Create a gateway with an empty registry.
    pub fn new(directory: SessionDirectory) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            directory,
        }
    }

    /// This instance's identity.
    pub fn instance(&self) -> &Instance {
        self.directory.instance()
    }

    /// Live connections on this instance.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// The shared session directory.
    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }

    /// Register a freshly accepted socket and publish its ownership.
    ///
    /// If the directory write fails the registry entry is rolled back; the
    /// caller closes the socket.
    #[instrument(skip_all, fields(session_id = %connection.id))]
    pub async fn open_session(
        &self,
        connection: Arc<ClientConnection>,
    ) -> Result<SessionRecord, GatewayError> {
        let session_id = connection.id.clone();
        self.registry.register(connection)?;
        match self.directory.add_session(&session_id).await {
            Ok(record) => {
                info!(instance = %self.instance().name, "session opened");
                Ok(record)
            }
            Err(e) => {
                let _ = self.registry.remove(&session_id);
                Err(e.into())
            }
        }
    }

    /// Tear a session down: close the socket, drop the registry entry, and
    /// delete the directory record. Failures are logged and never retried.
    #[instrument(skip_all, fields(session_id = %connection.id))]
    pub async fn close_session(&self, connection: &ClientConnection) {
        if let Err(e) = connection.close().await {
            debug!(error = %e, "socket close failed during teardown");
        }
        let _ = self.registry.remove(&connection.id);
        if let Err(e) = self.directory.delete(&connection.id).await {
            warn!(error = %e, "failed to remove session record");
        }
        info!(age_secs = connection.age().as_secs(), "session closed");
    }

    /// Deliver `message` to a session owned by this instance.
    ///
    /// The directory record decides ownership; the TTL is refreshed only
    /// after the socket write succeeded.
    #[instrument(skip(self, message))]
    pub async fn deliver(&self, session_id: &str, message: &str) -> Result<(), GatewayError> {
        let result = self.deliver_inner(session_id, message).await;
        record_outcome("rest", &result);
        result
    }

    async fn deliver_inner(&self, session_id: &str, message: &str) -> Result<(), GatewayError> {
        let record = self.directory.get(session_id).await?;
        if !record.is_owned_by(self.instance()) {
            return Err(GatewayError::OwnershipMismatch {
                session_id: session_id.to_string(),
                owner: record.owning_instance.name,
            });
        }
        self.write_local(session_id, message).await
    }

    /// Write `message` to a session connected to this instance, without
    /// consulting the directory for ownership.
    #[instrument(skip(self, message))]
    pub async fn relay(&self, session_id: &str, message: &str) -> Result<(), GatewayError> {
        let result = self.write_local(session_id, message).await;
        record_outcome("relay", &result);
        result
    }

    async fn write_local(&self, session_id: &str, message: &str) -> Result<(), GatewayError> {
        let connection = self
            .registry
            .lookup(session_id)
            .ok_or_else(|| GatewayError::Gone {
                session_id: session_id.to_string(),
            })?;
        connection.send_text(message).await.map_err(|e| {
            if !matches!(e, SocketError::Closed) {
                warn!(session_id, error = %e, "socket write failed");
            }
            GatewayError::Socket(e)
        })?;
        if let Err(e) = self.directory.refresh(session_id).await {
            warn!(session_id, error = %e, "delivered but ttl refresh failed");
        }
        Ok(())
    }

    /// Read-only lookup of the directory record.
    pub async fn lookup(&self, session_id: &str) -> Result<SessionRecord, GatewayError> {
        Ok(self.directory.get(session_id).await?)
    }

    /// Close every live socket. Safe to call more than once.
    pub async fn shutdown(&self) -> Result<(), SocketError> {
        self.registry.close_all(&self.directory).await
    }
}

fn record_outcome(route: &'static str, result: &Result<(), GatewayError>) {
    match result {
        Ok(()) => counter!(MESSAGES_DELIVERED_TOTAL, "route" => route).increment(1),
        Err(e) => {
            counter!(DELIVERY_FAILURES_TOTAL, "route" => route, "reason" => e.kind()).increment(1);
        }
    }
}
