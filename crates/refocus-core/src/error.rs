//! Core error types for refocus-core.
//!
//! Errors are grouped the same way callers react to them: validation failures
//! are raised synchronously at capture time, store failures are transient and
//! surfaced for the caller to retry, and configuration failures stop startup.
//! [`ErrorCode`] is the stable, serializable taxonomy shared with
//! [`RestorationResult`](crate::restore::RestorationResult).

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core error type for refocus-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A snapshot or switch event failed validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The snapshot store or its persistence backend failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

impl CoreError {
    /// Map this error onto the public error taxonomy, if it belongs to it.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            CoreError::Validation(_) | CoreError::Config(_) => Some(ErrorCode::ValidationError),
            CoreError::Store(_) => Some(ErrorCode::StoreUnavailable),
            CoreError::Io(_) | CoreError::Json(_) | CoreError::Custom(_) => None,
        }
    }
}

/// Validation errors raised while building snapshots and switch events.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Expiry does not come after capture
    #[error("Invalid time range: expires_at ({end}) must be after captured_at ({start})")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Cursor offsets are byte offsets and cannot be negative
    #[error("Cursor position must be >= 0, got {0}")]
    NegativeCursor(i64),

    /// A required identifier was empty
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Snapshot store and persistence errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend could not serve the request; callers may retry
    #[error("Snapshot store unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be decoded
    #[error("Corrupt record '{id}': {message}")]
    Corrupt { id: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration document
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Failed to render configuration as TOML
    #[error("Failed to serialize configuration: {0}")]
    SerializeFailed(String),
}

/// Stable error taxonomy exposed to callers and serialized into results.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Invalid snapshot or event at capture time
    ValidationError,
    /// Requested snapshot is absent or was never captured
    StateNotFound,
    /// Snapshot exists but its TTL has elapsed
    StateExpired,
    /// Persistence collaborator failed; transient
    StoreUnavailable,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::StateNotFound => "STATE_NOT_FOUND",
            ErrorCode::StateExpired => "STATE_EXPIRED",
            ErrorCode::StoreUnavailable => "STORE_UNAVAILABLE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg)
                if inner.code == rusqlite::ErrorCode::DatabaseLocked
                    || inner.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                StoreError::Unavailable("database is locked".to_string())
            }
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Store(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_serialize_as_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::StateExpired).unwrap();
        assert_eq!(json, "\"STATE_EXPIRED\"");
        let parsed: ErrorCode = serde_json::from_str("\"STORE_UNAVAILABLE\"").unwrap();
        assert_eq!(parsed, ErrorCode::StoreUnavailable);
    }

    #[test]
    fn display_matches_wire_name() {
        assert_eq!(ErrorCode::StateNotFound.to_string(), "STATE_NOT_FOUND");
        assert_eq!(ErrorCode::ValidationError.as_str(), "VALIDATION_ERROR");
    }

    #[test]
    fn core_error_maps_to_taxonomy() {
        let err: CoreError = ValidationError::NegativeCursor(-1).into();
        assert_eq!(err.code(), Some(ErrorCode::ValidationError));

        let err: CoreError = StoreError::Unavailable("down".into()).into();
        assert_eq!(err.code(), Some(ErrorCode::StoreUnavailable));

        let err = CoreError::Custom("other".into());
        assert_eq!(err.code(), None);
    }
}
