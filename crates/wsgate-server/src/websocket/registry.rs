//! Per-process map of session id to live socket.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::RwLock;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use wsgate_directory::SessionDirectory;

use super::connection::ClientConnection;
use crate::errors::{RegistryError, SocketError};

/// Upper bound on one socket's close handshake during [`ConnectionRegistry::close_all`].
pub const SOCKET_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct Inner {
    connections: HashMap<String, Arc<ClientConnection>>,
    draining: bool,
}

/// Live connections accepted by this instance.
///
/// Lookups share a read lock; register and remove take the write lock.
/// Socket I/O never happens while the lock is held.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<Inner>,
    shutdown: OnceCell<Result<(), SocketError>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a connection under its session id.
    ///
    /// An existing entry is never replaced. Fails once [`close_all`](Self::close_all)
    /// has started.
    pub fn register(&self, connection: Arc<ClientConnection>) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        if inner.draining {
            return Err(RegistryError::ShuttingDown);
        }
        if inner.connections.contains_key(&connection.id) {
            return Err(RegistryError::Duplicate(connection.id.clone()));
        }
        let _ = inner
            .connections
            .insert(connection.id.clone(), connection);
        Ok(())
    }

    /// The live connection for `session_id`, if any.
    pub fn lookup(&self, session_id: &str) -> Option<Arc<ClientConnection>> {
        self.inner.read().connections.get(session_id).cloned()
    }

    /// Drop the entry for `session_id`. Absent ids are ignored.
    pub fn remove(&self, session_id: &str) -> Option<Arc<ClientConnection>> {
        self.inner.write().connections.remove(session_id)
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.inner.read().connections.len()
    }

    /// Whether no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close every registered socket and clear their directory records.
    ///
    /// Runs once per registry. Concurrent and later callers wait for the first
    /// run and receive its result: the first socket close error, if any.
    /// Sockets close concurrently and each close is bounded by
    /// [`SOCKET_CLOSE_TIMEOUT`]; a socket that does not finish in time counts
    /// as a close error. Directory cleanup failures are logged and do not
    /// affect the result.
    pub async fn close_all(&self, directory: &SessionDirectory) -> Result<(), SocketError> {
        self.shutdown
            .get_or_init(|| self.drain(directory))
            .await
            .clone()
    }

    async fn drain(&self, directory: &SessionDirectory) -> Result<(), SocketError> {
        let connections: Vec<_> = {
            let mut inner = self.inner.write();
            inner.draining = true;
            inner.connections.drain().map(|(_, conn)| conn).collect()
        };
        info!(count = connections.len(), "closing all connections");

        let results = join_all(
            connections
                .iter()
                .map(|connection| Self::close_one(connection, directory)),
        )
        .await;
        let first_error = results.into_iter().find_map(Result::err);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn close_one(
        connection: &ClientConnection,
        directory: &SessionDirectory,
    ) -> Result<(), SocketError> {
        let result = tokio::time::timeout(SOCKET_CLOSE_TIMEOUT, connection.close())
            .await
            .unwrap_or_else(|_| {
                Err(SocketError::Close(format!(
                    "close timed out after {SOCKET_CLOSE_TIMEOUT:?}"
                )))
            });
        if let Err(e) = &result {
            warn!(session_id = %connection.id, error = %e, "failed to close socket");
        }
        if let Err(e) = directory.delete(&connection.id).await {
            warn!(session_id = %connection.id, error = %e, "failed to remove session record");
        }
        result
    }
}
