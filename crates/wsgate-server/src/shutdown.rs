//! Graceful shutdown coordination via `CancellationToken`.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Signals every server task to stop and bounds how long stopping may take.
#[derive(Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a clone of the cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Initiate shutdown.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Cancel the token, then wait up to `timeout` for `drain` to finish.
    ///
    /// Returns `None` when the deadline passed first.
    pub async fn graceful_shutdown<F: Future>(
        &self,
        drain: F,
        timeout: Duration,
    ) -> Option<F::Output> {
        self.shutdown();
        info!(timeout_secs = timeout.as_secs(), "shutting down");
        match tokio::time::timeout(timeout, drain).await {
            Ok(output) => Some(output),
            Err(_) => {
                warn!("shutdown timed out after {timeout:?}");
                None
            }
        }
    }
}
