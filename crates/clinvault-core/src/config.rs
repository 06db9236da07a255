//! Configuration for the vault

use crate::error::{Result, VaultError};
use clinvault_crypto::{DEFAULT_CREDENTIAL_ITERATIONS, DEFAULT_KEK_ITERATIONS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Setting names understood by [`VaultConfig::from_settings`]
pub mod keys {
    pub const DATABASE_PATH: &str = "database_path";
    pub const CREDENTIAL_ITERATIONS: &str = "credential_iterations";
    pub const KEK_ITERATIONS: &str = "kek_iterations";
    pub const MAX_FAILED_ATTEMPTS: &str = "max_failed_attempts";
    pub const MIN_PASSWORD_LENGTH: &str = "min_password_length";
    pub const MIN_KEK_PASSWORD_LENGTH: &str = "min_kek_password_length";
}

const DEFAULT_MAX_FAILED_ATTEMPTS: u32 = 5;
const DEFAULT_MIN_PASSWORD_LENGTH: usize = 8;
const DEFAULT_MIN_KEK_PASSWORD_LENGTH: usize = 12;

/// "Get a configuration value by key"
pub trait SettingsSource {
    fn get_setting(&self, key: &str) -> Option<String>;
}

impl SettingsSource for HashMap<String, String> {
    fn get_setting(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Settings read from `CLINVAULT_<KEY>` environment variables
#[derive(Debug, Clone)]
pub struct EnvSettings {
    prefix: String,
}

impl EnvSettings {
    pub fn new() -> Self {
        Self::with_prefix("CLINVAULT_")
    }

    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    fn variable_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_ascii_uppercase())
    }
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsSource for EnvSettings {
    fn get_setting(&self, key: &str) -> Option<String> {
        std::env::var(self.variable_name(key)).ok()
    }
}

fn default_credential_iterations() -> u32 {
    DEFAULT_CREDENTIAL_ITERATIONS
}

fn default_kek_iterations() -> u32 {
    DEFAULT_KEK_ITERATIONS
}

fn default_max_failed_attempts() -> u32 {
    DEFAULT_MAX_FAILED_ATTEMPTS
}

fn default_min_password_length() -> usize {
    DEFAULT_MIN_PASSWORD_LENGTH
}

fn default_min_kek_password_length() -> usize {
    DEFAULT_MIN_KEK_PASSWORD_LENGTH
}

/// Configuration for the vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Path of the SQLite file holding the vault
    pub database_path: PathBuf,

    /// PBKDF2 iterations for login passwords
    #[serde(default = "default_credential_iterations")]
    pub credential_iterations: u32,

    /// PBKDF2 iterations for the KEK, used when a new KEK is created
    #[serde(default = "default_kek_iterations")]
    pub kek_iterations: u32,

    /// Consecutive failed logins before an account is locked
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u32,

    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,

    #[serde(default = "default_min_kek_password_length")]
    pub min_kek_password_length: usize,
}

impl VaultConfig {
    /// Create a configuration with default settings for the given store
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            credential_iterations: DEFAULT_CREDENTIAL_ITERATIONS,
            kek_iterations: DEFAULT_KEK_ITERATIONS,
            max_failed_attempts: DEFAULT_MAX_FAILED_ATTEMPTS,
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
            min_kek_password_length: DEFAULT_MIN_KEK_PASSWORD_LENGTH,
        }
    }

    /// Build a configuration from a key/value source
    ///
    /// `database_path` is required; every other key falls back to its default.
    pub fn from_settings(source: &dyn SettingsSource) -> Result<Self> {
        let database_path = source
            .get_setting(keys::DATABASE_PATH)
            .filter(|path| !path.trim().is_empty())
            .ok_or_else(|| VaultError::Configuration(format!("missing setting {}", keys::DATABASE_PATH)))?;

        let mut config = Self::new(database_path.trim());
        if let Some(value) = parse_setting(source, keys::CREDENTIAL_ITERATIONS)? {
            config.credential_iterations = value;
        }
        if let Some(value) = parse_setting(source, keys::KEK_ITERATIONS)? {
            config.kek_iterations = value;
        }
        if let Some(value) = parse_setting(source, keys::MAX_FAILED_ATTEMPTS)? {
            config.max_failed_attempts = value;
        }
        if let Some(value) = parse_setting(source, keys::MIN_PASSWORD_LENGTH)? {
            config.min_password_length = value;
        }
        if let Some(value) = parse_setting(source, keys::MIN_KEK_PASSWORD_LENGTH)? {
            config.min_kek_password_length = value;
        }

        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from `CLINVAULT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_settings(&EnvSettings::new())
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| VaultError::Configuration(format!("cannot read {}: {}", path.display(), e)))?;
        let config: VaultConfig = serde_json::from_str(&content)
            .map_err(|e| VaultError::Configuration(format!("invalid config file {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no deployment should run with
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(VaultError::Configuration("database_path must not be empty".into()));
        }
        if self.credential_iterations == 0 || self.kek_iterations == 0 {
            return Err(VaultError::Configuration("iteration counts must be non-zero".into()));
        }
        if self.max_failed_attempts == 0 {
            return Err(VaultError::Configuration("max_failed_attempts must be non-zero".into()));
        }
        if self.min_password_length == 0 || self.min_kek_password_length == 0 {
            return Err(VaultError::Configuration("minimum password lengths must be non-zero".into()));
        }
        Ok(())
    }
}

fn parse_setting<T: std::str::FromStr>(source: &dyn SettingsSource, key: &str) -> Result<Option<T>> {
    match source.get_setting(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| VaultError::Configuration(format!("setting {} has invalid value {:?}", key, raw))),
    }
}

/// Builder for [`VaultConfig`]
pub struct VaultConfigBuilder {
    config: VaultConfig,
}

impl VaultConfigBuilder {
    /// Start from the defaults for the given store
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            config: VaultConfig::new(database_path),
        }
    }

    pub fn with_credential_iterations(mut self, iterations: u32) -> Self {
        self.config.credential_iterations = iterations;
        self
    }

    pub fn with_kek_iterations(mut self, iterations: u32) -> Self {
        self.config.kek_iterations = iterations;
        self
    }

    pub fn with_max_failed_attempts(mut self, attempts: u32) -> Self {
        self.config.max_failed_attempts = attempts;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<VaultConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
