//! Credential records in the `Users` table

use crate::error::{Result, StorageError};
use crate::sqlite::SqliteStore;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, ErrorCode, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of user roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Administrator,
    Clinician,
    ReadOnly,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "Administrator",
            Role::Clinician => "Clinician",
            Role::ReadOnly => "ReadOnly",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "administrator" => Ok(Role::Administrator),
            "clinician" => Ok(Role::Clinician),
            "readonly" => Ok(Role::ReadOnly),
            _ => Err(StorageError::Corrupted(format!("unknown role {:?}", s))),
        }
    }
}

/// Fields needed to create a user
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub password_salt: &'a str,
    pub full_name: Option<&'a str>,
    pub role: Role,
    pub force_password_change: bool,
}

/// A stored credential record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub password_salt: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: String,
    pub last_login: Option<String>,
    pub password_changed_at: Option<String>,
    pub failed_attempts: u32,
    pub force_password_change: bool,
}

const SELECT_USER: &str = "SELECT id, username, password_hash, password_salt, full_name, role, is_active,
            created_at, last_login, password_changed_at, failed_attempts, force_password_change
     FROM Users WHERE username = ?1";

fn flag(value: Value, column: &str) -> Result<bool> {
    match value {
        Value::Integer(0) => Ok(false),
        Value::Integer(1) => Ok(true),
        other => Err(StorageError::Corrupted(format!("{} holds {:?}, expected 0 or 1", column, other))),
    }
}

struct RawUser {
    id: i64,
    username: String,
    password_hash: String,
    password_salt: String,
    full_name: Option<String>,
    role: String,
    is_active: Value,
    created_at: String,
    last_login: Option<String>,
    password_changed_at: Option<String>,
    failed_attempts: i64,
    force_password_change: Value,
}

impl RawUser {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            password_salt: row.get(3)?,
            full_name: row.get(4)?,
            role: row.get(5)?,
            is_active: row.get(6)?,
            created_at: row.get(7)?,
            last_login: row.get(8)?,
            password_changed_at: row.get(9)?,
            failed_attempts: row.get(10)?,
            force_password_change: row.get(11)?,
        })
    }

    fn into_record(self) -> Result<UserRecord> {
        let failed_attempts = u32::try_from(self.failed_attempts)
            .map_err(|_| StorageError::Corrupted(format!("failed_attempts holds {}", self.failed_attempts)))?;
        Ok(UserRecord {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            password_salt: self.password_salt,
            full_name: self.full_name,
            role: self.role.parse()?,
            is_active: flag(self.is_active, "is_active")?,
            created_at: self.created_at,
            last_login: self.last_login,
            password_changed_at: self.password_changed_at,
            failed_attempts,
            force_password_change: flag(self.force_password_change, "force_password_change")?,
        })
    }
}

impl SqliteStore {
    /// Insert a new, active user and return its row id
    pub fn insert_user(&self, user: &NewUser<'_>) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let result = self.conn.execute(
            "INSERT INTO Users (username, password_hash, password_salt, full_name, role, is_active,
                                created_at, password_changed_at, failed_attempts, force_password_change)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6, 0, ?7)",
            params![
                user.username,
                user.password_hash,
                user.password_salt,
                user.full_name,
                user.role.as_str(),
                now,
                user.force_password_change,
            ],
        );

        match result {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StorageError::AlreadyExists(format!("user {}", user.username)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look up a user by name (case-insensitive)
    pub fn find_user(&self, username: &str) -> Result<Option<UserRecord>> {
        let raw = self
            .conn
            .query_row(SELECT_USER, params![username], RawUser::from_row)
            .optional()?;
        raw.map(RawUser::into_record).transpose()
    }

    /// Count active users holding the administrator role
    ///
    /// Every row is checked so that damaged role or flag data surfaces as
    /// [`StorageError::Corrupted`] instead of being silently skipped.
    pub fn count_active_administrators(&self) -> Result<u64> {
        let mut stmt = self.conn.prepare("SELECT role, is_active FROM Users")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, Value>(0)?, row.get::<_, Value>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut count = 0;
        for (role, active) in rows {
            let role = match role {
                Value::Text(text) => text.parse::<Role>()?,
                other => return Err(StorageError::Corrupted(format!("role holds {:?}", other))),
            };
            if flag(active, "is_active")? && role == Role::Administrator {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Reset the failure counter and stamp the login time
    pub fn record_login_success(&self, user_id: i64) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE Users SET failed_attempts = 0, last_login = ?1 WHERE id = ?2",
            params![now, user_id],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("user id {}", user_id)));
        }
        Ok(())
    }

    /// Increment the failure counter, returning the new value
    pub fn record_login_failure(&self, user_id: i64) -> Result<u32> {
        let attempts: Option<i64> = self
            .conn
            .query_row(
                "UPDATE Users SET failed_attempts = failed_attempts + 1 WHERE id = ?1 RETURNING failed_attempts",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        let attempts = attempts.ok_or_else(|| StorageError::NotFound(format!("user id {}", user_id)))?;
        u32::try_from(attempts).map_err(|_| StorageError::Corrupted(format!("failed_attempts holds {}", attempts)))
    }

    /// Replace a user's password hash, clearing the forced-change flag and the failure counter
    pub fn update_password(&self, user_id: i64, password_hash: &str, password_salt: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE Users
             SET password_hash = ?1, password_salt = ?2, password_changed_at = ?3, force_password_change = 0,
                 failed_attempts = 0
             WHERE id = ?4",
            params![password_hash, password_salt, now, user_id],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("user id {}", user_id)));
        }
        Ok(())
    }
}
