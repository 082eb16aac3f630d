//! Core error types for focusmint-core.
//!
//! This module defines the error hierarchy using thiserror. Note that
//! integrity failures and insufficient-balance spends are *not* errors:
//! they are normal outcomes surfaced as values by the session machine
//! and the ledger respectively.

use std::path::PathBuf;
use thiserror::Error;

use crate::session::SessionStatus;

/// Core error type for focusmint-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session lifecycle errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

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

/// Session lifecycle errors. Each variant reports an operation that is
/// not legal in the current state; the session is left unchanged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// `start` called on a session that is not pending
    #[error("Session cannot be started from the {0:?} state")]
    NotStartable(SessionStatus),

    /// Operation not legal in the current state
    #[error("Invalid transition: cannot {operation} from {from:?}")]
    InvalidTransition {
        operation: &'static str,
        from: SessionStatus,
    },

    /// Session already reached a terminal state
    #[error("Session is already terminal ({0:?})")]
    AlreadyTerminal(SessionStatus),

    /// No session currently exists
    #[error("No active session")]
    NoSession,
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
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

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Stored record could not be decoded
    #[error("Corrupt record for key '{key}': {message}")]
    CorruptRecord { key: String, message: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
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

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
