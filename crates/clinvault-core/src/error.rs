//! Error types for the clinvault core

use clinvault_crypto::CryptoError;
use clinvault_storage::StorageError;
use thiserror::Error;

/// Error type for vault operations
///
/// Messages are safe to show to an operator: they never contain passwords,
/// key material, hashes or salts.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Missing or invalid configuration, or a missing backing store
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed credentials or other input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Wrong password. Never says which part of a login was wrong.
    #[error("Authentication failed: {0}")]
    AuthenticationFailure(String),

    /// Derivation, encryption or decryption failure, or malformed key material
    #[error("Cryptographic error: {0}")]
    Cryptographic(#[from] CryptoError),

    /// I/O or transaction failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Schema or data inconsistency
    #[error("Corrupted state: {0}")]
    CorruptedState(String),

    /// The store ended up in a state nothing accounts for
    #[error("Unknown state: {0}")]
    UnknownState(String),
}

impl From<StorageError> for VaultError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::StoreNotFound(path) => VaultError::Configuration(format!("backing store not found: {}", path)),
            StorageError::Corrupted(message) => VaultError::CorruptedState(message),
            StorageError::AlreadyExists(message) => VaultError::Validation(format!("already exists: {}", message)),
            other => VaultError::Persistence(other.to_string()),
        }
    }
}

/// Result type for vault operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// The one message every failed login produces
pub(crate) fn login_failure() -> VaultError {
    VaultError::AuthenticationFailure("invalid username or password".to_string())
}
