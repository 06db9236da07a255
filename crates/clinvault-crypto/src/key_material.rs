//! Secret key material
//!
//! Derived keys only ever live inside a [`SecretKey`], which zeroes its bytes
//! when dropped and never prints them.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Secure key material that is zeroed on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: Vec<u8>,
}

impl SecretKey {
    /// Create a new SecretKey from bytes, taking ownership of them
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Get a reference to the key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the key in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Transient base64 form, for handing the key to a collaborator that
    /// cannot hold raw bytes. The returned string is the caller's to zeroize.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        ring::constant_time::verify_slices_are_equal(&self.bytes, &other.bytes).is_ok()
    }
}

impl Eq for SecretKey {}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKey {{ bytes: [REDACTED; {}] }}", self.bytes.len())
    }
}
