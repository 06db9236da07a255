//! The clinvault boundary API

use crate::bootstrap::{validate_password, AdminCredentials, BootstrapReport, Bootstrapper, Provisioned};
use crate::config::VaultConfig;
use crate::error::{login_failure, Result, VaultError};
use crate::kek_store::load_kek_artifact;
use crate::session::Session;
use crate::state::ProvisioningState;
use clinvault_crypto::{
    derive_key, hash_password, validate_kek, verify_password, EncryptedField, KekValidation, SecretKey,
    CREDENTIAL_HASH_SIZE, CREDENTIAL_SALT_SIZE,
};
use clinvault_storage::{Role, SqliteStore, UserRecord};
use tracing::{info, warn};

/// Fixed salt for the throwaway derivation run when a login names no user
const TIMING_SALT: [u8; CREDENTIAL_SALT_SIZE] = [0x5C; CREDENTIAL_SALT_SIZE];

/// Entry point for every operation on a clinical record vault
///
/// Holds only configuration. Each call opens its own store handle and closes
/// it before returning, and all per-user state lives in [`Session`] values.
pub struct ClinicalVault {
    config: VaultConfig,
}

impl ClinicalVault {
    /// Create a vault over the store named by `config`
    pub fn new(config: VaultConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Classify the backing store
    pub fn get_state(&self) -> ProvisioningState {
        Bootstrapper::new(&self.config).classify()
    }

    /// Provision a virgin store and log the new administrator in
    ///
    /// The returned session already holds the KEK derived during
    /// provisioning.
    pub fn bootstrap(&self, admin: &AdminCredentials, kek_password: &str) -> Result<(BootstrapReport, Session)> {
        let provisioned = Bootstrapper::new(&self.config).provision(admin, kek_password)?;
        Ok(Self::open_admin_session(provisioned))
    }

    /// Create an administrator for a store in `KekNoAdmin`
    pub fn provision_administrator(
        &self,
        admin: &AdminCredentials,
        kek_password: &str,
    ) -> Result<(BootstrapReport, Session)> {
        let provisioned = Bootstrapper::new(&self.config).provision_administrator(admin, kek_password)?;
        Ok(Self::open_admin_session(provisioned))
    }

    fn open_admin_session(provisioned: Provisioned) -> (BootstrapReport, Session) {
        let Provisioned {
            report,
            admin_id,
            username,
            kek,
        } = provisioned;
        let mut session = Session::new(admin_id, &username, Role::Administrator, false);
        session.install_kek(kek);
        (report, session)
    }

    /// Check a username and password
    ///
    /// Unknown, inactive and locked users and wrong passwords all fail with
    /// the same error.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Session> {
        self.require_ready()?;
        let store = SqliteStore::open_existing(&self.config.database_path)?;

        let user = match store.find_user(username.trim())? {
            Some(user) => user,
            None => {
                self.equalize_timing(password);
                warn!("Login failed: unknown user");
                return Err(login_failure());
            }
        };

        self.check_password(&store, &user, password)?;

        store.record_login_success(user.id)?;
        store.close()?;
        info!(username = %user.username, role = %user.role, "Login succeeded");
        Ok(Session::new(user.id, &user.username, user.role, user.force_password_change))
    }

    /// Unlock the session with the KEK password
    ///
    /// Any outcome other than success leaves the session without a key.
    pub fn validate_kek(&self, session: &mut Session, kek_password: &str) -> Result<()> {
        match self.recover_kek(kek_password) {
            Ok(key) => {
                session.install_kek(key);
                info!(username = session.username(), "KEK validated");
                Ok(())
            }
            Err(e) => {
                session.clear_kek();
                warn!(username = session.username(), error = %e, "KEK validation failed");
                Err(e)
            }
        }
    }

    fn recover_kek(&self, kek_password: &str) -> Result<SecretKey> {
        let store = SqliteStore::open_existing(&self.config.database_path)?;
        let artifact = load_kek_artifact(&store, self.config.kek_iterations)?;
        store.close()?;

        match validate_kek(kek_password, &artifact.verification_hash, &artifact.salt, artifact.iterations)? {
            KekValidation::Valid(key) => Ok(key),
            KekValidation::Invalid => Err(VaultError::AuthenticationFailure("invalid KEK password".into())),
        }
    }

    /// Encrypt one field with the session KEK
    pub fn encrypt_field(&self, session: &Session, plaintext: &str) -> Result<EncryptedField> {
        Ok(clinvault_crypto::encrypt_field(plaintext, session.kek()?)?)
    }

    /// Decrypt one field with the session KEK
    pub fn decrypt_field(&self, session: &Session, field: &EncryptedField) -> Result<String> {
        Ok(clinvault_crypto::decrypt_field(&field.ciphertext, &field.iv, session.kek()?)?)
    }

    /// Replace the session user's password
    pub fn change_password(&self, session: &mut Session, current_password: &str, new_password: &str) -> Result<()> {
        validate_password(new_password, self.config.min_password_length, "new password")?;
        if new_password == current_password {
            return Err(VaultError::Validation("new password must differ from the current one".into()));
        }

        let store = SqliteStore::open_existing(&self.config.database_path)?;
        let user = store.find_user(session.username())?.ok_or_else(login_failure)?;
        if user.id != session.user_id() {
            return Err(login_failure());
        }

        self.check_password(&store, &user, current_password)?;

        let credential = hash_password(new_password, self.config.credential_iterations)?;
        store.update_password(user.id, &credential.hash, &credential.salt)?;
        store.close()?;

        session.password_changed();
        info!(username = %user.username, "Password changed");
        Ok(())
    }

    /// End a session, zeroing its KEK
    pub fn logout(&self, session: Session) {
        session.logout();
    }

    /// Password check shared by login and password change
    ///
    /// The derivation runs before the account checks so inactive and locked
    /// accounts take as long to refuse as a wrong password.
    fn check_password(&self, store: &SqliteStore, user: &UserRecord, password: &str) -> Result<()> {
        let verified = verify_password(
            password,
            &user.password_hash,
            &user.password_salt,
            self.config.credential_iterations,
        )?;

        if !user.is_active {
            warn!(username = %user.username, "Password refused: account inactive");
            return Err(login_failure());
        }
        if user.failed_attempts >= self.config.max_failed_attempts {
            warn!(username = %user.username, "Password refused: account locked");
            return Err(login_failure());
        }
        if !verified {
            let attempts = store.record_login_failure(user.id)?;
            warn!(username = %user.username, attempts, "Wrong password");
            if attempts >= self.config.max_failed_attempts {
                warn!(username = %user.username, "Account locked after repeated failures");
            }
            return Err(login_failure());
        }
        Ok(())
    }

    fn require_ready(&self) -> Result<()> {
        match self.get_state() {
            ProvisioningState::ProductionReady => Ok(()),
            ProvisioningState::Corrupted => Err(VaultError::CorruptedState(
                "the store is corrupted and needs manual recovery".into(),
            )),
            ProvisioningState::Error => Err(VaultError::Persistence("the store could not be read".into())),
            state => Err(VaultError::Configuration(format!("the vault is not provisioned ({})", state))),
        }
    }

    fn equalize_timing(&self, password: &str) {
        let _ = derive_key(
            password.as_bytes(),
            &TIMING_SALT,
            self.config.credential_iterations,
            CREDENTIAL_HASH_SIZE,
        );
    }
}
