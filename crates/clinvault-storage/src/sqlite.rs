//! SQLite connection handling

use crate::error::{Result, StorageError};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// How long a statement waits on a locked database before failing
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Whether a store file exists at `path`
pub fn store_exists(path: &Path) -> bool {
    path.is_file()
}

/// An open handle on the vault database
///
/// The handle owns its connection exclusively; dropping it closes the
/// connection. Use [`SqliteStore::close`] to observe close errors.
#[derive(Debug)]
pub struct SqliteStore {
    pub(crate) conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open the store at `path`, creating the file if needed
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_flags(path, OpenFlags::default())
    }

    /// Open the store at `path`, failing if the file does not exist
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !store_exists(path) {
            return Err(StorageError::StoreNotFound(path.display().to_string()));
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Self::open_with_flags(path, flags)
    }

    /// Open a private in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Ok(Self { conn, path: None })
    }

    fn open_with_flags(path: &Path, flags: OpenFlags) -> Result<Self> {
        let conn = Connection::open_with_flags(path, flags)?;
        Self::configure(&conn)?;
        debug!("Opened store at {}", path.display());
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    fn configure(conn: &Connection) -> Result<()> {
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(())
    }

    /// Path of the backing file, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Borrow the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Names of every table in the store, as reported by its object list
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Names of every index in the store
    pub fn list_indexes(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM sqlite_master WHERE type = 'index'")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Close the connection, reporting any error
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| StorageError::Sqlite(e))
    }
}
