//! Key Derivation Functions (KDFs)
//!
//! PBKDF2 with HMAC-SHA256 is the single derivation primitive used by both
//! login credentials and the key-encryption key. Callers choose the
//! iteration count; everything else about the construction is fixed.

use crate::error::{CryptoError, Result};
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;

/// Derive `output_len` bytes from `secret` and `salt`
///
/// # Arguments
///
/// * `secret` - The password, or a previously derived key
/// * `salt` - Salt for the derivation, must not be empty
/// * `iterations` - PBKDF2 iteration count, must be non-zero
/// * `output_len` - Number of bytes to produce, must be non-zero
///
/// # Returns
///
/// The derived bytes. Identical inputs always produce identical output.
pub fn derive_key(secret: &[u8], salt: &[u8], iterations: u32, output_len: usize) -> Result<Vec<u8>> {
    if iterations == 0 {
        return Err(CryptoError::InvalidParameter("iteration count must be non-zero".into()));
    }
    if salt.is_empty() {
        return Err(CryptoError::InvalidParameter("salt must not be empty".into()));
    }
    if output_len == 0 {
        return Err(CryptoError::InvalidParameter("output length must be non-zero".into()));
    }

    let mut output = vec![0u8; output_len];
    pbkdf2_hmac::<Sha256>(secret, salt, iterations, &mut output);
    Ok(output)
}

/// Generate a random salt of `length` bytes from the OS random source
pub fn generate_salt(length: usize) -> Result<Vec<u8>> {
    if length == 0 {
        return Err(CryptoError::InvalidParameter("salt length must be non-zero".into()));
    }
    let mut salt = vec![0u8; length];
    OsRng.try_fill_bytes(&mut salt)?;
    Ok(salt)
}
