//! Key-encryption-key (KEK) derivation and verification
//!
//! The KEK is derived from the operator password and a 32-byte salt. What gets
//! persisted is a second derivation applied to the derived key itself, with
//! the same salt and iteration count:
//!
//! ```text
//! derived_kek       = PBKDF2(password,    salt, n, 32)
//! verification_hash = PBKDF2(derived_kek, salt, n, 32)
//! ```
//!
//! Knowing the verification hash does not give the key, and a correct
//! password can be recognised without the key ever touching storage.

use crate::credential::decode_exact;
use crate::error::Result;
use crate::kdf::{derive_key, generate_salt};
use crate::key_material::SecretKey;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use zeroize::Zeroize;

/// Default iteration count for the KEK
pub const DEFAULT_KEK_ITERATIONS: u32 = 100_000;
/// Salt size for the KEK verification artifact
pub const KEK_SALT_SIZE: usize = 32;
/// Size of the derived KEK and of its verification hash
pub const KEK_SIZE: usize = 32;

/// Output of [`create_kek`]
///
/// Only `verification_hash`, `salt` and `iterations` may be persisted. The
/// derived key is returned so the caller can seed a session on first
/// provisioning.
#[derive(Debug)]
pub struct KekMaterial {
    pub derived_kek: SecretKey,
    /// base64 of the 32-byte hash of the derived key
    pub verification_hash: String,
    /// base64 of the 32-byte salt
    pub salt: String,
    pub iterations: u32,
}

impl KekMaterial {
    /// Split into the session key and the persistable artifact
    pub fn into_parts(self) -> (SecretKey, KekArtifact) {
        (
            self.derived_kek,
            KekArtifact {
                verification_hash: self.verification_hash,
                salt: self.salt,
                iterations: self.iterations,
            },
        )
    }
}

/// The persistable half of [`KekMaterial`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KekArtifact {
    pub verification_hash: String,
    pub salt: String,
    pub iterations: u32,
}

/// Result of [`validate_kek`]
///
/// A failed validation carries nothing at all, so no key bytes can leak
/// through an error value or a log line.
#[derive(Debug, PartialEq, Eq)]
pub enum KekValidation {
    Valid(SecretKey),
    Invalid,
}

impl KekValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, KekValidation::Valid(_))
    }

    /// The recovered key, if the password was correct
    pub fn into_key(self) -> Option<SecretKey> {
        match self {
            KekValidation::Valid(key) => Some(key),
            KekValidation::Invalid => None,
        }
    }
}

/// Derive the KEK and its verification hash. Shared by creation and
/// validation so the two can never disagree on order or parameters.
fn derive_pair(password: &str, salt: &[u8], iterations: u32) -> Result<(SecretKey, Vec<u8>)> {
    let derived = SecretKey::new(derive_key(password.as_bytes(), salt, iterations, KEK_SIZE)?);
    let verification = derive_key(derived.as_bytes(), salt, iterations, KEK_SIZE)?;
    Ok((derived, verification))
}

/// Create a new KEK from an operator password
pub fn create_kek(password: &str, iterations: u32) -> Result<KekMaterial> {
    let salt = generate_salt(KEK_SALT_SIZE)?;
    let (derived_kek, mut verification) = derive_pair(password, &salt, iterations)?;

    let material = KekMaterial {
        derived_kek,
        verification_hash: BASE64.encode(&verification),
        salt: BASE64.encode(&salt),
        iterations,
    };
    verification.zeroize();

    tracing::debug!(iterations, "Created KEK verification artifact");
    Ok(material)
}

/// Validate an operator password against a stored verification artifact
///
/// Malformed stored values are reported as errors rather than as
/// [`KekValidation::Invalid`].
pub fn validate_kek(password: &str, stored_hash: &str, stored_salt: &str, iterations: u32) -> Result<KekValidation> {
    let expected = decode_exact(stored_hash, KEK_SIZE, "KEK verification hash")?;
    let salt = decode_exact(stored_salt, KEK_SALT_SIZE, "KEK salt")?;

    let (derived, mut computed) = derive_pair(password, &salt, iterations)?;
    let matched = ring::constant_time::verify_slices_are_equal(&computed, &expected).is_ok();
    computed.zeroize();

    if matched {
        Ok(KekValidation::Valid(derived))
    } else {
        // `derived` is zeroed as it drops here
        Ok(KekValidation::Invalid)
    }
}
