//! Error types for the crypto module

use thiserror::Error;

/// Result type for crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors that can occur in crypto operations
#[derive(Error, Debug)]
pub enum CryptoError {
    /// A derivation or cipher parameter was out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The system random source failed
    #[error("Random source error: {0}")]
    Random(String),

    /// A stored hash, salt or envelope could not be decoded or had the wrong length
    #[error("Malformed stored value: {0}")]
    MalformedStoredValue(String),

    /// Error with the key
    #[error("Key error: {0}")]
    Key(String),

    /// Error during encryption
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Error during decryption
    #[error("Decryption error: {0}")]
    Decryption(String),
}

impl From<rand::Error> for CryptoError {
    fn from(err: rand::Error) -> Self {
        CryptoError::Random(format!("OS random source failed: {}", err))
    }
}
