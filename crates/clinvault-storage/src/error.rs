//! Error types for storage operations

use thiserror::Error;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur in storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error reported by SQLite
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing store file does not exist
    #[error("Store not found: {0}")]
    StoreNotFound(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Already exists error
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A transaction was rolled back
    #[error("Transaction rolled back: {0}")]
    Transaction(String),

    /// Stored data does not have the shape the schema promises
    #[error("Corrupted data: {0}")]
    Corrupted(String),
}
