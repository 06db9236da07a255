//! Persistence of the KEK verification artifact in the `Config` table

use crate::error::{Result, VaultError};
use clinvault_crypto::KekArtifact;
use clinvault_storage::{NewConfigEntry, ProvisioningProbe, SqliteStore, StorageError};

pub const KEK_HASH_KEY: &str = "KEK_Hash";
pub const KEK_SALT_KEY: &str = "KEK_Salt";
pub const KEK_ITERATIONS_KEY: &str = "KEK_Iterations";

/// Write hash, salt and iteration count in one transaction
///
/// Refuses once a hash is stored. Salt or iteration rows left without a hash
/// are replaced.
pub(crate) fn persist_kek_artifact(store: &mut SqliteStore, artifact: &KekArtifact) -> Result<()> {
    let iterations = artifact.iterations.to_string();
    let entries = [
        NewConfigEntry {
            key: KEK_HASH_KEY,
            value: &artifact.verification_hash,
            description: "Verification hash of the key-encryption key",
        },
        NewConfigEntry {
            key: KEK_SALT_KEY,
            value: &artifact.salt,
            description: "Salt for key-encryption key derivation",
        },
        NewConfigEntry {
            key: KEK_ITERATIONS_KEY,
            value: &iterations,
            description: "PBKDF2 iterations for key-encryption key derivation",
        },
    ];

    store
        .insert_config_entries(KEK_HASH_KEY, &entries)
        .map_err(|e| match e {
            StorageError::AlreadyExists(_) => VaultError::Validation("a KEK is already provisioned for this store".into()),
            other => other.into(),
        })
}

/// Read the stored artifact
///
/// Stores provisioned without a `KEK_Iterations` row fall back to
/// `default_iterations`.
pub(crate) fn load_kek_artifact<P: ProvisioningProbe + ?Sized>(
    probe: &P,
    default_iterations: u32,
) -> Result<KekArtifact> {
    let verification_hash = required_value(probe, KEK_HASH_KEY)?;
    let salt = required_value(probe, KEK_SALT_KEY)?;
    let iterations = match probe.read_config(KEK_ITERATIONS_KEY)? {
        None => default_iterations,
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| VaultError::CorruptedState(format!("{} is not a positive integer", KEK_ITERATIONS_KEY)))?,
    };

    Ok(KekArtifact {
        verification_hash,
        salt,
        iterations,
    })
}

fn required_value<P: ProvisioningProbe + ?Sized>(probe: &P, key: &str) -> Result<String> {
    match probe.read_config(key)? {
        None => Err(VaultError::Configuration(format!("no KEK is provisioned ({} missing)", key))),
        Some(value) if value.trim().is_empty() => Err(VaultError::CorruptedState(format!("{} is empty", key))),
        Some(value) => Ok(value),
    }
}
