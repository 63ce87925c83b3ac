//! Directory error types.

use thiserror::Error;

/// Errors from directory operations.
///
/// `NotFound` is produced only from an explicit "key absent" answer; any
/// transport failure stays `Unavailable` so callers never mistake an outage
/// for a missing session.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The session is absent or its record has expired.
    #[error("session not found: {session_id}")]
    NotFound {
        /// Session that was looked up.
        session_id: String,
    },
    /// The backing store could not be reached or rejected the command.
    #[error("directory store unavailable: {0}")]
    Unavailable(String),
    /// A record could not be serialized or a stored value could not be parsed.
    #[error("session record encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl DirectoryError {
    /// Whether this is the not-found kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<redis::RedisError> for DirectoryError {
    fn from(err: redis::RedisError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Result type for directory operations.
pub type Result<T> = std::result::Result<T, DirectoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = DirectoryError::NotFound {
            session_id: "abc".into(),
        };
        assert_eq!(err.to_string(), "session not found: abc");
        assert!(err.is_not_found());
    }

    #[test]
    fn unavailable_is_not_not_found() {
        let err = DirectoryError::Unavailable("connection refused".into());
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn redis_error_maps_to_unavailable() {
        let redis_err = redis::RedisError::from((redis::ErrorKind::IoError, "broken pipe"));
        let err: DirectoryError = redis_err.into();
        assert!(matches!(err, DirectoryError::Unavailable(_)));
    }
}
