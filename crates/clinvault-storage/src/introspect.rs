//! Schema introspection seams used by the bootstrap state machine

use crate::error::Result;
use crate::sqlite::SqliteStore;
use tracing::{debug, warn};

/// Answers whether a table exists in a backing store
///
/// Stores without a queryable catalog implement this by scanning whatever
/// object enumeration they offer. The probe never fails: if the store cannot
/// be enumerated the table is reported absent.
pub trait SchemaIntrospector {
    fn table_exists(&self, name: &str) -> bool;
}

/// Everything state classification reads from a store
pub trait ProvisioningProbe: SchemaIntrospector {
    /// Read a value from the configuration table
    fn read_config(&self, key: &str) -> Result<Option<String>>;

    /// Count active users holding the administrator role
    ///
    /// Fails with [`crate::StorageError::Corrupted`] when a role or active
    /// flag cannot be interpreted.
    fn count_active_administrators(&self) -> Result<u64>;
}

impl SchemaIntrospector for SqliteStore {
    fn table_exists(&self, name: &str) -> bool {
        match self.list_tables() {
            Ok(tables) => {
                let found = tables.iter().any(|table| table.eq_ignore_ascii_case(name));
                debug!(table = name, found, "Probed table");
                found
            }
            Err(e) => {
                warn!(table = name, error = %e, "Table enumeration failed, treating table as absent");
                false
            }
        }
    }
}

impl ProvisioningProbe for SqliteStore {
    fn read_config(&self, key: &str) -> Result<Option<String>> {
        SqliteStore::read_config(self, key)
    }

    fn count_active_administrators(&self) -> Result<u64> {
        SqliteStore::count_active_administrators(self)
    }
}
