//! Authenticated sessions and the session-held KEK

use crate::error::{Result, VaultError};
use clinvault_crypto::SecretKey;
use clinvault_storage::Role;
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

/// Opaque identifier for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(Uuid);

impl SessionToken {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An authenticated user and, once unlocked, the derived KEK
///
/// The key slot belongs to this value alone. It is emptied on logout, when a
/// KEK validation fails, and when the session is dropped; the key bytes are
/// zeroed each time.
#[derive(Debug)]
pub struct Session {
    token: SessionToken,
    user_id: i64,
    username: String,
    role: Role,
    must_change_password: bool,
    kek: Option<SecretKey>,
}

impl Session {
    pub(crate) fn new(user_id: i64, username: &str, role: Role, must_change_password: bool) -> Self {
        let session = Self {
            token: SessionToken::generate(),
            user_id,
            username: username.to_string(),
            role,
            must_change_password,
            kek: None,
        };
        debug!(token = %session.token, username, "Session opened");
        session
    }

    pub fn token(&self) -> SessionToken {
        self.token
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether the user has to pick a new password before doing anything else
    pub fn must_change_password(&self) -> bool {
        self.must_change_password
    }

    /// Whether a validated KEK is held
    pub fn is_unlocked(&self) -> bool {
        self.kek.is_some()
    }

    pub(crate) fn user_id(&self) -> i64 {
        self.user_id
    }

    pub(crate) fn password_changed(&mut self) {
        self.must_change_password = false;
    }

    /// Store a freshly validated KEK, replacing any previous one
    pub(crate) fn install_kek(&mut self, key: SecretKey) {
        self.kek = Some(key);
        debug!(token = %self.token, "Session KEK installed");
    }

    /// Drop the held KEK, if any
    pub fn clear_kek(&mut self) {
        if self.kek.take().is_some() {
            debug!(token = %self.token, "Session KEK cleared");
        }
    }

    pub(crate) fn kek(&self) -> Result<&SecretKey> {
        self.kek
            .as_ref()
            .ok_or_else(|| VaultError::Validation("the session KEK has not been unlocked".into()))
    }

    /// End the session
    pub fn logout(mut self) {
        self.clear_kek();
        info!(token = %self.token, username = %self.username, "Logged out");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.kek = None;
    }
}
