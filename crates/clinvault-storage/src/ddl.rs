//! Transactional schema creation

use crate::error::{Result, StorageError};
use crate::sqlite::SqliteStore;
use rusqlite::{params, ErrorCode, Transaction};
use tracing::{debug, error, info};

/// Kind of schema object a statement creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    Index,
}

impl ObjectKind {
    /// The `type` column value in `sqlite_master`
    fn catalog_type(&self) -> &'static str {
        match self {
            ObjectKind::Table => "table",
            ObjectKind::Index => "index",
        }
    }
}

/// One schema-creation statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdlStatement {
    pub kind: ObjectKind,
    /// Name of the object the statement creates
    pub name: String,
    pub sql: String,
}

impl DdlStatement {
    pub fn table(name: &str, sql: &str) -> Self {
        Self {
            kind: ObjectKind::Table,
            name: name.to_string(),
            sql: sql.to_string(),
        }
    }

    pub fn index(name: &str, sql: &str) -> Self {
        Self {
            kind: ObjectKind::Index,
            name: name.to_string(),
            sql: sql.to_string(),
        }
    }
}

/// What a committed DDL batch did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DdlOutcome {
    /// Objects created by this batch
    pub created: Vec<String>,
    /// Objects that already existed and were left alone
    pub skipped: Vec<String>,
}

// SQLite reports "already exists" as a plain SQLITE_ERROR. With a modern
// bundled SQLite rusqlite surfaces it as `SqlInputError`, older builds as
// `SqliteFailure`.
fn is_already_exists(err: &rusqlite::Error) -> bool {
    let generic_error = match err {
        rusqlite::Error::SqliteFailure(e, _) => e.code == ErrorCode::Unknown,
        rusqlite::Error::SqlInputError { error, .. } => error.code == ErrorCode::Unknown,
        _ => false,
    };
    generic_error && err.to_string().contains("already exists")
}

fn object_exists(tx: &Transaction<'_>, statement: &DdlStatement) -> Result<bool> {
    let count: i64 = tx.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = ?1 AND name = ?2 COLLATE NOCASE",
        params![statement.kind.catalog_type(), statement.name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

impl SqliteStore {
    /// Run `statements` in order inside a single transaction
    ///
    /// A statement whose object already exists is skipped. Any other failure
    /// rolls back every statement in the batch and returns
    /// [`StorageError::Transaction`] naming the failing object.
    pub fn execute_ddl_transaction(&mut self, statements: &[DdlStatement]) -> Result<DdlOutcome> {
        let tx = self.conn.transaction()?;
        let mut outcome = DdlOutcome::default();

        for statement in statements {
            if object_exists(&tx, statement)? {
                debug!(object = %statement.name, "Schema object already exists, skipping");
                outcome.skipped.push(statement.name.clone());
                continue;
            }
            match tx.execute_batch(&statement.sql) {
                Ok(()) => {
                    debug!(object = %statement.name, kind = ?statement.kind, "Created schema object");
                    outcome.created.push(statement.name.clone());
                }
                Err(e) if is_already_exists(&e) => {
                    debug!(object = %statement.name, "Schema object already exists, skipping");
                    outcome.skipped.push(statement.name.clone());
                }
                Err(e) => {
                    error!(object = %statement.name, error = %e, "Schema statement failed, rolling back");
                    tx.rollback()?;
                    return Err(StorageError::Transaction(format!(
                        "creating {:?} {} failed: {}",
                        statement.kind, statement.name, e
                    )));
                }
            }
        }

        tx.commit()?;
        info!(
            created = outcome.created.len(),
            skipped = outcome.skipped.len(),
            "Schema transaction committed"
        );
        Ok(outcome)
    }
}
