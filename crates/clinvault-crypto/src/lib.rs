//! Crypto component for clinvault
//!
//! This crate provides the cryptographic building blocks for the clinical
//! record vault: PBKDF2 key derivation, login credential hashing, the
//! double-derivation KEK verification scheme, and AES-256-CBC field
//! encryption keyed by the session-held KEK.

mod credential;
mod error;
mod field;
mod kdf;
mod kek;
mod key_material;

pub use credential::{
    hash_password, verify_password, PasswordHash, CREDENTIAL_HASH_SIZE, CREDENTIAL_SALT_SIZE,
    DEFAULT_CREDENTIAL_ITERATIONS,
};
pub use error::{CryptoError, Result};
pub use field::{decrypt_field, encrypt_field, EncryptedField, IV_SIZE};
pub use kdf::{derive_key, generate_salt};
pub use kek::{
    create_kek, validate_kek, KekArtifact, KekMaterial, KekValidation, DEFAULT_KEK_ITERATIONS, KEK_SALT_SIZE,
    KEK_SIZE,
};
pub use key_material::SecretKey;
