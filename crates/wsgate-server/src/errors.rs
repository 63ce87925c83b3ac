//! Gateway error kinds and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error};
use wsgate_directory::DirectoryError;

/// Failure writing to or closing a live socket.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SocketError {
    /// The socket was already closed locally.
    #[error("socket already closed")]
    Closed,
    /// A frame could not be written.
    #[error("socket write failed: {0}")]
    Write(String),
    /// The close handshake could not be sent.
    #[error("socket close failed: {0}")]
    Close(String),
    /// Closing did not finish before the shutdown deadline.
    #[error("shutdown deadline exceeded")]
    Timeout,
}

/// Connection registry failures.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A connection with this session id is already registered.
    #[error("session already registered: {0}")]
    Duplicate(String),
    /// The registry has been drained for shutdown.
    #[error("registry is shutting down")]
    ShuttingDown,
}

/// Errors surfaced by the gateway protocol handlers.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No directory record for the session (absent or expired).
    #[error("session not found: {session_id}")]
    NotFound {
        /// Requested session.
        session_id: String,
    },
    /// The session is owned by another instance.
    #[error("session {session_id} owned by instance {owner}")]
    OwnershipMismatch {
        /// Requested session.
        session_id: String,
        /// Name of the owning instance.
        owner: String,
    },
    /// The session is not connected to this instance.
    #[error("session not connected to this instance: {session_id}")]
    Gone {
        /// Requested session.
        session_id: String,
    },
    /// The WebSocket handshake was rejected.
    #[error("websocket upgrade failed: {0}")]
    UpgradeFailure(String),
    /// The directory store could not be reached.
    #[error("directory store unavailable: {0}")]
    StoreUnavailable(String),
    /// A record or payload could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(String),
    /// The request body was malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Writing to or closing the target socket failed.
    #[error(transparent)]
    Socket(#[from] SocketError),
    /// The connection could not be registered.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl GatewayError {
    /// HTTP status for this error kind.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::OwnershipMismatch { .. }
            | Self::UpgradeFailure(_)
            | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Gone { .. } | Self::Socket(SocketError::Closed) => StatusCode::GONE,
            Self::Registry(RegistryError::ShuttingDown) => StatusCode::SERVICE_UNAVAILABLE,
            Self::StoreUnavailable(_)
            | Self::Encoding(_)
            | Self::Socket(_)
            | Self::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::OwnershipMismatch { .. } => "ownership_mismatch",
            Self::Gone { .. } | Self::Socket(SocketError::Closed) => "gone",
            Self::UpgradeFailure(_) => "upgrade_failure",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Encoding(_) => "encoding",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Socket(_) => "socket",
            Self::Registry(_) => "registry",
        }
    }

    /// Short plain-text body returned to HTTP callers.
    pub fn body(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "Session not found",
            Self::OwnershipMismatch { .. } => "Session owned by different instance.",
            Self::Gone { .. } | Self::Socket(SocketError::Closed) => {
                "Session not connected to this instance."
            }
            Self::UpgradeFailure(_) => "Upgrade failed!",
            Self::InvalidRequest(_) => "Invalid request",
            Self::Socket(_) => "Failed to write to websocket of session.",
            Self::Registry(RegistryError::ShuttingDown) => "Server is shutting down",
            Self::StoreUnavailable(_) | Self::Encoding(_) | Self::Registry(_) => {
                "Internal server error"
            }
        }
    }
}

impl From<DirectoryError> for GatewayError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound { session_id } => Self::NotFound { session_id },
            DirectoryError::Unavailable(msg) => Self::StoreUnavailable(msg),
            DirectoryError::Encoding(e) => Self::Encoding(e.to_string()),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, self.body()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid() -> String {
        "s1".to_string()
    }

    #[test]
    fn status_mapping() {
        let cases = [
            (GatewayError::NotFound { session_id: sid() }, 404),
            (
                GatewayError::OwnershipMismatch {
                    session_id: sid(),
                    owner: "gw-b".into(),
                },
                400,
            ),
            (GatewayError::Gone { session_id: sid() }, 410),
            (GatewayError::UpgradeFailure("no upgrade header".into()), 400),
            (GatewayError::StoreUnavailable("down".into()), 500),
            (GatewayError::Encoding("bad".into()), 500),
            (GatewayError::InvalidRequest("eof".into()), 400),
            (GatewayError::Socket(SocketError::Write("reset".into())), 500),
            (GatewayError::Socket(SocketError::Closed), 410),
            (GatewayError::Socket(SocketError::Timeout), 500),
            (GatewayError::Registry(RegistryError::ShuttingDown), 503),
            (GatewayError::Registry(RegistryError::Duplicate(sid())), 500),
        ];
        for (err, code) in cases {
            assert_eq!(err.status().as_u16(), code, "{err}");
        }
    }

    #[test]
    fn closed_socket_counts_as_gone() {
        let err = GatewayError::Socket(SocketError::Closed);
        assert_eq!(err.kind(), "gone");
        assert_eq!(err.body(), "Session not connected to this instance.");
    }

    #[test]
    fn directory_not_found_stays_not_found() {
        let err: GatewayError = DirectoryError::NotFound { session_id: sid() }.into();
        assert!(matches!(err, GatewayError::NotFound { .. }));
    }

    #[test]
    fn directory_outage_is_not_not_found() {
        let err: GatewayError = DirectoryError::Unavailable("timeout".into()).into();
        assert!(matches!(err, GatewayError::StoreUnavailable(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn response_carries_plain_body() {
        let resp = GatewayError::Gone { session_id: sid() }.into_response();
        assert_eq!(resp.status(), StatusCode::GONE);
        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Session not connected to this instance.");
    }
}
