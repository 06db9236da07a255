//! Key/value access to the `Config` table

use crate::error::{Result, StorageError};
use crate::sqlite::SqliteStore;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::Serialize;

/// One row of the `Config` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: Option<String>,
    pub description: Option<String>,
    pub modified_at: String,
}

/// A value to write with [`SqliteStore::insert_config_entries`]
#[derive(Debug, Clone, Copy)]
pub struct NewConfigEntry<'a> {
    pub key: &'a str,
    pub value: &'a str,
    pub description: &'a str,
}

const UPSERT_CONFIG: &str = "INSERT INTO Config (key, value, description, modified_at)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT (key) DO UPDATE SET
         value = excluded.value,
         description = COALESCE(excluded.description, Config.description),
         modified_at = excluded.modified_at";

impl SqliteStore {
    /// Read a configuration value; an absent key is `Ok(None)`
    ///
    /// A row whose value is SQL NULL also reads as `None`.
    pub fn read_config(&self, key: &str) -> Result<Option<String>> {
        let value: Option<Option<String>> = self
            .conn
            .query_row("SELECT value FROM Config WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value.flatten())
    }

    /// Insert or replace a configuration value
    pub fn write_config(&self, key: &str, value: &str, description: Option<&str>) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(UPSERT_CONFIG, params![key, value, description, now])?;
        Ok(())
    }

    /// Write several values in one transaction, unless `guard_key` already
    /// holds a non-empty value
    ///
    /// Rows for the other keys are replaced, so a batch interrupted before
    /// the guard key was written can be retried.
    pub fn insert_config_entries(&mut self, guard_key: &str, entries: &[NewConfigEntry<'_>]) -> Result<()> {
        let tx = self.conn.transaction()?;

        let guard: Option<Option<String>> = tx
            .query_row("SELECT value FROM Config WHERE key = ?1", params![guard_key], |row| row.get(0))
            .optional()?;
        if let Some(Some(value)) = guard {
            if !value.trim().is_empty() {
                return Err(StorageError::AlreadyExists(format!("config key {}", guard_key)));
            }
        }

        let now = Utc::now().to_rfc3339();
        for entry in entries {
            tx.execute(UPSERT_CONFIG, params![entry.key, entry.value, entry.description, now])?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Every configuration row, ordered by key
    pub fn list_config(&self) -> Result<Vec<ConfigEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value, description, modified_at FROM Config ORDER BY key")?;
        let entries = stmt
            .query_map([], |row| {
                Ok(ConfigEntry {
                    key: row.get(0)?,
                    value: row.get(1)?,
                    description: row.get(2)?,
                    modified_at: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
