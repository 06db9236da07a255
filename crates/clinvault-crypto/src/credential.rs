//! Login credential hashing
//!
//! Per-user password hashes: a 16-byte random salt and a 32-byte
//! PBKDF2-HMAC-SHA256 digest, both carried as base64 text so they can live in
//! ordinary text columns.

use crate::error::{CryptoError, Result};
use crate::kdf::{derive_key, generate_salt};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use zeroize::Zeroize;

/// Default iteration count for login credentials
pub const DEFAULT_CREDENTIAL_ITERATIONS: u32 = 10_000;
/// Salt size for login credentials
pub const CREDENTIAL_SALT_SIZE: usize = 16;
/// Digest size for login credentials
pub const CREDENTIAL_HASH_SIZE: usize = 32;

/// Stored form of a login password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    /// base64 of the 32-byte digest
    pub hash: String,
    /// base64 of the 16-byte salt
    pub salt: String,
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str, iterations: u32) -> Result<PasswordHash> {
    let salt = generate_salt(CREDENTIAL_SALT_SIZE)?;
    let mut digest = derive_key(password.as_bytes(), &salt, iterations, CREDENTIAL_HASH_SIZE)?;

    let stored = PasswordHash {
        hash: BASE64.encode(&digest),
        salt: BASE64.encode(&salt),
    };
    digest.zeroize();
    Ok(stored)
}

/// Check a password against a stored hash and salt
///
/// Returns `Ok(false)` for a wrong password and
/// `Err(CryptoError::MalformedStoredValue)` when the stored record itself is
/// unusable, so callers can tell a failed login from a corrupt row.
pub fn verify_password(password: &str, stored_hash: &str, stored_salt: &str, iterations: u32) -> Result<bool> {
    let expected = decode_exact(stored_hash, CREDENTIAL_HASH_SIZE, "password hash")?;
    let salt = decode_exact(stored_salt, CREDENTIAL_SALT_SIZE, "password salt")?;

    let mut computed = derive_key(password.as_bytes(), &salt, iterations, CREDENTIAL_HASH_SIZE)?;
    let matched = ring::constant_time::verify_slices_are_equal(&computed, &expected).is_ok();
    computed.zeroize();

    Ok(matched)
}

/// Decode a base64 value and require an exact decoded length
pub(crate) fn decode_exact(encoded: &str, expected_len: usize, what: &str) -> Result<Vec<u8>> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| CryptoError::MalformedStoredValue(format!("{} is not valid base64: {}", what, e)))?;

    if bytes.len() != expected_len {
        return Err(CryptoError::MalformedStoredValue(format!(
            "{} has length {}, expected {}",
            what,
            bytes.len(),
            expected_len
        )));
    }

    Ok(bytes)
}
