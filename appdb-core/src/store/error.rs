//! Error types for the record store

use thiserror::Error;

/// Errors raised by the storage backend and the per-namespace record store
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required id or payload was missing or empty
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Write into a namespace that was never created
    #[error("Unknown namespace: {0}")]
    UnknownNamespace(String),

    /// The namespace is already held by a different developer
    #[error("Namespace {0} belongs to another developer")]
    NamespaceOwned(String),

    /// No connection could be checked out of the pool
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// SQLite rejected a statement
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The database directory could not be created
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
