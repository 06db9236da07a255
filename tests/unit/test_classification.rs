use crate::test_utils::test_config;
use clinvault::crypto::create_kek;
use clinvault::storage::schema::schema_statements;
use clinvault::storage::{NewConfigEntry, NewUser, Role, SqliteStore};
use clinvault::{classify_path, ProvisioningState, KEK_HASH_KEY, KEK_ITERATIONS_KEY, KEK_SALT_KEY};

fn full_schema_store(path: &std::path::Path) -> SqliteStore {
    let mut store = SqliteStore::open(path).unwrap();
    store.execute_ddl_transaction(&schema_statements()).unwrap();
    store
}

fn store_kek(store: &mut SqliteStore) {
    let material = create_kek("ward seven kek passphrase", 128).unwrap();
    let iterations = material.iterations.to_string();
    let entries = [
        NewConfigEntry {
            key: KEK_HASH_KEY,
            value: &material.verification_hash,
            description: "hash",
        },
        NewConfigEntry {
            key: KEK_SALT_KEY,
            value: &material.salt,
            description: "salt",
        },
        NewConfigEntry {
            key: KEK_ITERATIONS_KEY,
            value: &iterations,
            description: "iterations",
        },
    ];
    store.insert_config_entries(KEK_HASH_KEY, &entries).unwrap();
}

fn add_user(store: &SqliteStore, username: &str, role: Role) {
    store
        .insert_user(&NewUser {
            username,
            password_hash: "aGFzaA==",
            password_salt: "c2FsdA==",
            full_name: None,
            role,
            force_password_change: false,
        })
        .unwrap();
}

#[test]
fn test_empty_store_is_virgin() {
    let (config, _dir) = test_config();
    assert_eq!(classify_path(&config.database_path), ProvisioningState::VirginDatabase);

    // an existing but empty SQLite file reads the same
    SqliteStore::open(&config.database_path).unwrap().close().unwrap();
    assert_eq!(classify_path(&config.database_path), ProvisioningState::VirginDatabase);
}

#[test]
fn test_users_and_config_only_is_incomplete() {
    let (config, _dir) = test_config();
    let store = SqliteStore::open(&config.database_path).unwrap();
    store
        .connection()
        .execute_batch(
            "CREATE TABLE Config (id INTEGER PRIMARY KEY, key TEXT UNIQUE, value TEXT);
             CREATE TABLE Users (id INTEGER PRIMARY KEY, username TEXT UNIQUE);",
        )
        .unwrap();
    drop(store);

    assert_eq!(classify_path(&config.database_path), ProvisioningState::BootstrapIncomplete);
}

#[test]
fn test_full_schema_with_empty_config_is_virgin() {
    let (config, _dir) = test_config();
    drop(full_schema_store(&config.database_path));
    assert_eq!(classify_path(&config.database_path), ProvisioningState::VirginDatabase);
}

#[test]
fn test_kek_without_active_admin() {
    let (config, _dir) = test_config();
    let mut store = full_schema_store(&config.database_path);
    store_kek(&mut store);
    add_user(&store, "drjones", Role::Clinician);
    drop(store);

    assert_eq!(classify_path(&config.database_path), ProvisioningState::KekNoAdmin);
}

#[test]
fn test_kek_with_active_admin_is_ready() {
    let (config, _dir) = test_config();
    let mut store = full_schema_store(&config.database_path);
    store_kek(&mut store);
    add_user(&store, "admin", Role::Administrator);
    drop(store);

    assert_eq!(classify_path(&config.database_path), ProvisioningState::ProductionReady);
}

#[test]
fn test_empty_kek_hash_is_corrupted() {
    let (config, _dir) = test_config();
    let store = full_schema_store(&config.database_path);
    store.write_config(KEK_HASH_KEY, "", None).unwrap();
    drop(store);

    assert_eq!(classify_path(&config.database_path), ProvisioningState::Corrupted);
}

#[test]
fn test_unknown_role_is_corrupted() {
    let (config, _dir) = test_config();
    let mut store = full_schema_store(&config.database_path);
    store_kek(&mut store);
    add_user(&store, "admin", Role::Administrator);
    store
        .connection()
        .execute("UPDATE Users SET role = 'Janitor'", [])
        .unwrap();
    drop(store);

    assert_eq!(classify_path(&config.database_path), ProvisioningState::Corrupted);
}
