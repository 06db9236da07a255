//! clinvault
//!
//! An encrypted clinical record store. Sensitive fields are encrypted under a
//! key-encryption key (KEK) derived from an operator password; only a
//! verification artifact for the KEK is ever persisted, and the derived key
//! lives in memory for the lifetime of an authenticated [`Session`].
//!
//! The primary interface is [`ClinicalVault`]:
//!
//! ```no_run
//! use clinvault::{AdminCredentials, ClinicalVault, VaultConfig};
//!
//! # fn main() -> clinvault::Result<()> {
//! let vault = ClinicalVault::new(VaultConfig::new("/var/lib/clinvault/vault.db"))?;
//! let (_report, session) = vault.bootstrap(
//!     &AdminCredentials::new("admin", "a strong password"),
//!     "a longer kek passphrase",
//! )?;
//! let field = vault.encrypt_field(&session, "Jane Doe")?;
//! assert_eq!(vault.decrypt_field(&session, &field)?, "Jane Doe");
//! vault.logout(session);
//! # Ok(())
//! # }
//! ```

pub use clinvault_core::{
    classify_path, classify_store, keys, AdminCredentials, BootstrapReport, Bootstrapper, ClinicalVault,
    EncryptedField, EnvSettings, ProvisioningState, Result, Role, Session, SessionToken, SettingsSource,
    VaultConfig, VaultConfigBuilder, VaultError, KEK_HASH_KEY, KEK_ITERATIONS_KEY, KEK_SALT_KEY,
};

/// Lower-level building blocks
pub use clinvault_crypto as crypto;
pub use clinvault_storage as storage;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Version of the clinvault crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Initialize logging for the application
///
/// `RUST_LOG` wins over `log_level` when set.
pub fn init_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(fmt::layer().with_target(true).compact())
        .init();
}
