//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading or parsing settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read a settings file from disk.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in a settings file.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A profile was requested but its file does not exist.
    #[error("profile settings file not found: {}", .0.display())]
    MissingProfile(PathBuf),
    /// A settings value was invalid (e.g., out of range).
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_profile_display_names_path() {
        let err = SettingsError::MissingProfile(PathBuf::from("configs/application-prod.json"));
        assert_eq!(
            err.to_string(),
            "profile settings file not found: configs/application-prod.json"
        );
    }

    #[test]
    fn json_error_from_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        let err: SettingsError = json_err.into();
        assert!(matches!(err, SettingsError::Json(_)));
    }

    #[test]
    fn invalid_value_display() {
        let err = SettingsError::InvalidValue("redis.timeout must be at least 1".to_string());
        assert_eq!(
            err.to_string(),
            "invalid settings value: redis.timeout must be at least 1"
        );
    }
}
