//! Core error types for zonekeeper-core.
//!
//! Each concern owns a small thiserror enum; [`CoreError`] aggregates them
//! for callers that only need to report a failure.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for zonekeeper-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Envelope decoding errors
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Transfer errors
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// Session errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Malformed or incompatible envelope. The message is dropped and local
/// state is kept.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("envelope is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("envelope is not a JSON object")]
    NotAnObject,

    #[error("envelope carries no known payload key")]
    MissingPayload,

    #[error("envelope carries more than one payload key: {0:?}")]
    AmbiguousPayload(Vec<String>),

    #[error("invalid payload for '{key}': {message}")]
    InvalidPayload { key: String, message: String },
}

/// Messaging channel failures. Logged, never blocks the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("peer is unreachable")]
    Unreachable,

    #[error("transfer failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("transport is closed")]
    Closed,
}

/// Sample source failures. The tick is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    #[error("no fresh reading available")]
    Unavailable,

    #[error("access to the sample source was denied")]
    AuthorizationDenied,

    #[error("sample source failed: {0}")]
    Source(String),

    #[error("no reading within {0:?}")]
    TimedOut(std::time::Duration),
}

/// Errors surfaced by the session controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("heart rate access is not authorized")]
    AuthorizationDenied,
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Data directory could not be prepared
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
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

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
