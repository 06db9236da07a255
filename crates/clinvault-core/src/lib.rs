//! Core functionality for clinvault
//!
//! Ties the crypto and storage crates together: the bootstrap state machine
//! that provisions a store, per-user sessions that hold the unlocked KEK, and
//! [`ClinicalVault`], the single entry point for callers.

mod bootstrap;
mod config;
mod error;
mod kek_store;
mod session;
mod state;
mod vault;

pub use bootstrap::{classify_path, classify_store, AdminCredentials, BootstrapReport, Bootstrapper};
pub use config::{keys, EnvSettings, SettingsSource, VaultConfig, VaultConfigBuilder};
pub use error::{Result, VaultError};
pub use kek_store::{KEK_HASH_KEY, KEK_ITERATIONS_KEY, KEK_SALT_KEY};
pub use session::{Session, SessionToken};
pub use state::ProvisioningState;
pub use vault::ClinicalVault;

pub use clinvault_crypto::EncryptedField;
pub use clinvault_storage::Role;
