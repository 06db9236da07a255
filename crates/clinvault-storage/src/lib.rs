//! Storage component for clinvault
//!
//! This crate owns everything clinvault persists, kept in a single SQLite
//! file:
//!
//! - Schema definition and transactional, idempotent creation
//! - Table-existence probing through the [`SchemaIntrospector`] seam
//! - Key/value access to the `Config` table
//! - Credential records in the `Users` table

mod config_table;
mod ddl;
mod error;
mod introspect;
pub mod schema;
mod sqlite;
mod users;

pub use config_table::{ConfigEntry, NewConfigEntry};
pub use ddl::{DdlOutcome, DdlStatement, ObjectKind};
pub use error::{Result, StorageError};
pub use introspect::{ProvisioningProbe, SchemaIntrospector};
pub use sqlite::{store_exists, SqliteStore, DEFAULT_BUSY_TIMEOUT};
pub use users::{NewUser, Role, UserRecord};
