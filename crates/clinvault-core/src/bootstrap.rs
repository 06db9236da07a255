//! Bootstrap state machine
//!
//! Classifies a backing store into a [`ProvisioningState`] and drives the two
//! provisioning transitions: `VirginDatabase -> ProductionReady` (full
//! bootstrap) and `KekNoAdmin -> ProductionReady` (administrator recovery).
//! Classification is recomputed on every call.

use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use crate::kek_store::{load_kek_artifact, persist_kek_artifact, KEK_HASH_KEY, KEK_SALT_KEY};
use crate::state::ProvisioningState;
use clinvault_crypto::{create_kek, hash_password, validate_kek, KekValidation, SecretKey};
use clinvault_storage::schema::{schema_statements, REQUIRED_TABLES};
use clinvault_storage::{store_exists, DdlOutcome, NewUser, ProvisioningProbe, Role, SqliteStore};
use std::fmt;
use std::path::Path;
use tracing::{debug, error, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

const MAX_USERNAME_LENGTH: usize = 64;

/// Classify an opened store
///
/// Table probing never fails; a failed configuration read is reported as
/// `Error` and a failed administrator count as `Corrupted`.
pub fn classify_store<P: ProvisioningProbe + ?Sized>(probe: &P) -> ProvisioningState {
    let missing: Vec<&str> = REQUIRED_TABLES
        .iter()
        .copied()
        .filter(|table| !probe.table_exists(table))
        .collect();

    if missing.len() == REQUIRED_TABLES.len() {
        debug!("No required tables present");
        return ProvisioningState::VirginDatabase;
    }
    if !missing.is_empty() {
        warn!(missing = ?missing, "Store is partially provisioned");
        return ProvisioningState::BootstrapIncomplete;
    }

    match probe.read_config(KEK_HASH_KEY) {
        Ok(None) => {
            debug!("Schema present but no KEK provisioned");
            return ProvisioningState::VirginDatabase;
        }
        Ok(Some(hash)) if hash.trim().is_empty() => {
            warn!("KEK hash row exists but is empty");
            return ProvisioningState::Corrupted;
        }
        Ok(Some(_)) => {}
        Err(e) => {
            error!(error = %e, "Reading the KEK hash failed");
            return ProvisioningState::Error;
        }
    }

    match probe.read_config(KEK_SALT_KEY) {
        Ok(Some(salt)) if !salt.trim().is_empty() => {}
        Ok(_) => {
            warn!("KEK hash present without a KEK salt");
            return ProvisioningState::Corrupted;
        }
        Err(e) => {
            error!(error = %e, "Reading the KEK salt failed");
            return ProvisioningState::Error;
        }
    }

    match probe.count_active_administrators() {
        Ok(0) => ProvisioningState::KekNoAdmin,
        Ok(administrators) => {
            debug!(administrators, "Active administrators found");
            ProvisioningState::ProductionReady
        }
        Err(e) => {
            error!(error = %e, "Counting administrators failed");
            ProvisioningState::Corrupted
        }
    }
}

/// Classify the store at `path`
pub fn classify_path(path: &Path) -> ProvisioningState {
    if !store_exists(path) {
        debug!(path = %path.display(), "Store file does not exist");
        return ProvisioningState::VirginDatabase;
    }

    let store = match SqliteStore::open_existing(path) {
        Ok(store) => store,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Cannot open store");
            return ProvisioningState::Error;
        }
    };
    // A file SQLite cannot read would otherwise look like an empty store
    if let Err(e) = store.list_tables() {
        error!(path = %path.display(), error = %e, "Cannot read store catalog");
        return ProvisioningState::Error;
    }

    let state = classify_store(&store);
    info!(path = %path.display(), state = %state, "Classified store");
    state
}

/// Credentials for a new administrator
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AdminCredentials {
    username: String,
    password: String,
    full_name: Option<String>,
}

impl AdminCredentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            full_name: None,
        }
    }

    pub fn with_full_name(mut self, full_name: &str) -> Self {
        self.full_name = Some(full_name.to_string());
        self
    }

    /// The username as it will be stored
    pub fn username(&self) -> &str {
        self.username.trim()
    }

    pub fn full_name(&self) -> Option<&str> {
        self.full_name.as_deref()
    }

    fn validate(&self, config: &VaultConfig) -> Result<()> {
        validate_username(&self.username)?;
        validate_password(&self.password, config.min_password_length, "administrator password")
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("full_name", &self.full_name)
            .finish()
    }
}

pub(crate) fn validate_username(username: &str) -> Result<()> {
    let username = username.trim();
    if username.is_empty() {
        return Err(VaultError::Validation("username must not be empty".into()));
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(VaultError::Validation(format!(
            "username must be at most {} characters",
            MAX_USERNAME_LENGTH
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@'))
    {
        return Err(VaultError::Validation(
            "username may only contain letters, digits, '.', '_', '-' and '@'".into(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_password(password: &str, min_length: usize, what: &str) -> Result<()> {
    if password.trim().is_empty() || password.chars().count() < min_length {
        return Err(VaultError::Validation(format!(
            "{} must be at least {} characters",
            what, min_length
        )));
    }
    Ok(())
}

/// What a provisioning transition did
#[derive(Debug, Clone)]
pub struct BootstrapReport {
    /// State after the transition, always `ProductionReady`
    pub state: ProvisioningState,
    /// Tables and indexes created or skipped
    pub schema: DdlOutcome,
}

/// Result of a provisioning transition, before it is turned into a session
#[derive(Debug)]
pub(crate) struct Provisioned {
    pub report: BootstrapReport,
    pub admin_id: i64,
    pub username: String,
    pub kek: SecretKey,
}

/// Drives provisioning of the store named by a [`VaultConfig`]
pub struct Bootstrapper<'a> {
    config: &'a VaultConfig,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(config: &'a VaultConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self) -> ProvisioningState {
        classify_path(&self.config.database_path)
    }

    /// Provision a virgin store: schema, KEK artifact and first administrator
    ///
    /// Inputs are validated before anything touches the store. A failure
    /// after schema creation leaves a state this method or
    /// [`Bootstrapper::provision_administrator`] can resume from.
    pub(crate) fn provision(&self, admin: &AdminCredentials, kek_password: &str) -> Result<Provisioned> {
        admin.validate(self.config)?;
        validate_password(kek_password, self.config.min_kek_password_length, "KEK password")?;

        let state = self.classify();
        if state != ProvisioningState::VirginDatabase {
            return Err(VaultError::Validation(format!(
                "bootstrap requires a VirginDatabase store, found {}",
                state
            )));
        }
        info!(path = %self.config.database_path.display(), "Bootstrapping vault");

        let mut store = SqliteStore::open(&self.config.database_path)?;
        let schema = store.execute_ddl_transaction(&schema_statements())?;
        info!(created = schema.created.len(), skipped = schema.skipped.len(), "Schema in place");

        let (kek, artifact) = create_kek(kek_password, self.config.kek_iterations)?.into_parts();
        persist_kek_artifact(&mut store, &artifact)?;
        info!(iterations = artifact.iterations, "KEK verification artifact stored");

        let admin_id = self.insert_administrator(&store, admin)?;
        store.close()?;

        let state = self.expect_ready()?;
        Ok(Provisioned {
            report: BootstrapReport { state, schema },
            admin_id,
            username: admin.username().to_string(),
            kek,
        })
    }

    /// Create an administrator for a store stuck in `KekNoAdmin`
    ///
    /// The KEK password has to match the stored artifact first.
    pub(crate) fn provision_administrator(&self, admin: &AdminCredentials, kek_password: &str) -> Result<Provisioned> {
        admin.validate(self.config)?;

        let state = self.classify();
        if state != ProvisioningState::KekNoAdmin {
            return Err(VaultError::Validation(format!(
                "administrator recovery requires a KekNoAdmin store, found {}",
                state
            )));
        }

        let store = SqliteStore::open_existing(&self.config.database_path)?;
        let artifact = load_kek_artifact(&store, self.config.kek_iterations)?;
        let kek = match validate_kek(kek_password, &artifact.verification_hash, &artifact.salt, artifact.iterations)? {
            KekValidation::Valid(key) => key,
            KekValidation::Invalid => {
                warn!("KEK password rejected during administrator recovery");
                return Err(VaultError::AuthenticationFailure("invalid KEK password".into()));
            }
        };

        let admin_id = self.insert_administrator(&store, admin)?;
        store.close()?;

        let state = self.expect_ready()?;
        Ok(Provisioned {
            report: BootstrapReport {
                state,
                schema: DdlOutcome::default(),
            },
            admin_id,
            username: admin.username().to_string(),
            kek,
        })
    }

    fn insert_administrator(&self, store: &SqliteStore, admin: &AdminCredentials) -> Result<i64> {
        let credential = hash_password(&admin.password, self.config.credential_iterations)?;
        let admin_id = store.insert_user(&NewUser {
            username: admin.username(),
            password_hash: &credential.hash,
            password_salt: &credential.salt,
            full_name: admin.full_name(),
            role: Role::Administrator,
            force_password_change: false,
        })?;
        store.record_login_success(admin_id)?;
        info!(username = admin.username(), "Administrator created");
        Ok(admin_id)
    }

    fn expect_ready(&self) -> Result<ProvisioningState> {
        let state = self.classify();
        if state == ProvisioningState::ProductionReady {
            info!("Vault is ProductionReady");
            Ok(state)
        } else {
            error!(state = %state, "Provisioning finished in an unexpected state");
            Err(VaultError::UnknownState(format!(
                "expected ProductionReady after provisioning, found {}",
                state
            )))
        }
    }
}
