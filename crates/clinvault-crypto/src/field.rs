//! Field-level encryption for sensitive record attributes
//!
//! AES-256-CBC with PKCS#7 padding and a fresh random 16-byte IV per call.
//! The stored ciphertext is `cbc_output || tag`, where the tag is an
//! HMAC-SHA256 over `iv || cbc_output` (encrypt-then-MAC). Cipher and MAC keys
//! are derived from the KEK under fixed labels so the KEK itself is never
//! used for two purposes.

use crate::error::{CryptoError, Result};
use crate::kek::KEK_SIZE;
use crate::key_material::SecretKey;
use aes::Aes256;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// IV size for a 128-bit block cipher
pub const IV_SIZE: usize = 16;
const TAG_SIZE: usize = 32;
const BLOCK_SIZE: usize = 16;

const ENC_KEY_LABEL: &[u8] = b"clinvault/field/aes-256-cbc";
const MAC_KEY_LABEL: &[u8] = b"clinvault/field/hmac-sha256";

/// An encrypted attribute as stored: ciphertext and IV, both base64
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedField {
    pub ciphertext: String,
    pub iv: String,
}

fn subkey(key: &SecretKey, label: &[u8]) -> Result<SecretKey> {
    if key.len() != KEK_SIZE {
        return Err(CryptoError::Key(format!(
            "field encryption requires a {}-byte key, got {}",
            KEK_SIZE,
            key.len()
        )));
    }
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::Key(format!("Invalid key for HMAC: {}", e)))?;
    mac.update(label);
    Ok(SecretKey::new(mac.finalize().into_bytes().to_vec()))
}

fn compute_tag(mac_key: &SecretKey, iv: &[u8], body: &[u8]) -> Result<HmacSha256> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key.as_bytes())
        .map_err(|e| CryptoError::Key(format!("Invalid key for HMAC: {}", e)))?;
    mac.update(iv);
    mac.update(body);
    Ok(mac)
}

fn as_decryption(err: CryptoError) -> CryptoError {
    match err {
        CryptoError::Key(message) => CryptoError::Decryption(message),
        other => other,
    }
}

/// Encrypt a text field under `key`
pub fn encrypt_field(plaintext: &str, key: &SecretKey) -> Result<EncryptedField> {
    let enc_key = subkey(key, ENC_KEY_LABEL)?;
    let mac_key = subkey(key, MAC_KEY_LABEL)?;

    let mut iv = [0u8; IV_SIZE];
    OsRng.try_fill_bytes(&mut iv)?;

    let mut body = Aes256CbcEnc::new_from_slices(enc_key.as_bytes(), &iv)
        .map_err(|e| CryptoError::Encryption(format!("Failed to initialize cipher: {}", e)))?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    let tag = compute_tag(&mac_key, &iv, &body)?.finalize().into_bytes();
    body.extend_from_slice(&tag);

    Ok(EncryptedField {
        ciphertext: BASE64.encode(&body),
        iv: BASE64.encode(iv),
    })
}

/// Decrypt a text field previously produced by [`encrypt_field`]
///
/// Every failure, whether bad encoding, wrong key, tampering or bad padding,
/// is reported as [`CryptoError::Decryption`]; no partial plaintext is
/// ever returned.
pub fn decrypt_field(ciphertext: &str, iv: &str, key: &SecretKey) -> Result<String> {
    let enc_key = subkey(key, ENC_KEY_LABEL).map_err(as_decryption)?;
    let mac_key = subkey(key, MAC_KEY_LABEL).map_err(as_decryption)?;

    let iv = BASE64
        .decode(iv.trim())
        .map_err(|_| CryptoError::Decryption("IV is not valid base64".into()))?;
    if iv.len() != IV_SIZE {
        return Err(CryptoError::Decryption(format!("IV must be {} bytes", IV_SIZE)));
    }

    let sealed = BASE64
        .decode(ciphertext.trim())
        .map_err(|_| CryptoError::Decryption("Ciphertext is not valid base64".into()))?;
    if sealed.len() < BLOCK_SIZE + TAG_SIZE || (sealed.len() - TAG_SIZE) % BLOCK_SIZE != 0 {
        return Err(CryptoError::Decryption("Ciphertext has invalid length".into()));
    }
    let (body, tag) = sealed.split_at(sealed.len() - TAG_SIZE);

    compute_tag(&mac_key, &iv, body)?
        .verify_slice(tag)
        .map_err(|_| CryptoError::Decryption("Integrity check failed".into()))?;

    let plaintext = Aes256CbcDec::new_from_slices(enc_key.as_bytes(), &iv)
        .map_err(|e| CryptoError::Decryption(format!("Failed to initialize cipher: {}", e)))?
        .decrypt_padded_vec_mut::<Pkcs7>(body)
        .map_err(|_| CryptoError::Decryption("Invalid padding".into()))?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::Decryption("Plaintext is not valid UTF-8".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_key() -> SecretKey {
        let mut bytes = vec![0u8; KEK_SIZE];
        OsRng.fill_bytes(&mut bytes);
        SecretKey::new(bytes)
    }

    #[test]
    fn test_round_trip() {
        let key = random_key();
        let long = "x".repeat(1000);
        for text in ["", "Jane Doe", "Ünïcødé patient 患者", long.as_str()] {
            let sealed = encrypt_field(text, &key).unwrap();
            assert_eq!(decrypt_field(&sealed.ciphertext, &sealed.iv, &key).unwrap(), text);
        }
    }

    #[test]
    fn test_fresh_iv_per_call() {
        let key = random_key();
        let a = encrypt_field("same plaintext", &key).unwrap();
        let b = encrypt_field("same plaintext", &key).unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
        assert_eq!(BASE64.decode(&a.iv).unwrap().len(), IV_SIZE);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = encrypt_field("Jane Doe", &random_key()).unwrap();
        let result = decrypt_field(&sealed.ciphertext, &sealed.iv, &random_key());
        assert!(matches!(result, Err(CryptoError::Decryption(_))));
    }

    #[test]
    fn test_tampering_fails() {
        let key = random_key();
        let sealed = encrypt_field("Jane Doe", &key).unwrap();

        let mut body = BASE64.decode(&sealed.ciphertext).unwrap();
        body[0] ^= 0x01;
        let tampered = BASE64.encode(&body);
        assert!(matches!(decrypt_field(&tampered, &sealed.iv, &key), Err(CryptoError::Decryption(_))));

        let other = encrypt_field("John Roe", &key).unwrap();
        assert!(matches!(
            decrypt_field(&sealed.ciphertext, &other.iv, &key),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn test_malformed_envelope_fails() {
        let key = random_key();
        let sealed = encrypt_field("Jane Doe", &key).unwrap();

        assert!(decrypt_field("***", &sealed.iv, &key).is_err());
        assert!(decrypt_field(&sealed.ciphertext, "***", &key).is_err());
        assert!(decrypt_field(&sealed.ciphertext, &BASE64.encode([0u8; 8]), &key).is_err());
        assert!(decrypt_field(&BASE64.encode([0u8; 20]), &sealed.iv, &key).is_err());
    }

    #[test]
    fn test_key_length_enforced() {
        let short = SecretKey::new(vec![0u8; 16]);
        assert!(matches!(encrypt_field("x", &short), Err(CryptoError::Key(_))));

        let key = SecretKey::new(vec![3u8; KEK_SIZE]);
        let sealed = encrypt_field("x", &key).unwrap();
        assert!(matches!(
            decrypt_field(&sealed.ciphertext, &sealed.iv, &short),
            Err(CryptoError::Decryption(_))
        ));
    }
}
