use crate::test_utils::{test_config, ADMIN_PASSWORD, KEK_PASSWORD};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use clinvault::crypto::{decrypt_field, derive_key, SecretKey, KEK_SIZE};
use clinvault::storage::SqliteStore;
use clinvault::{AdminCredentials, ClinicalVault, KEK_HASH_KEY, KEK_ITERATIONS_KEY, KEK_SALT_KEY};

fn bootstrap_and_recompute_kek() -> (ClinicalVault, SecretKey, tempfile::TempDir) {
    let (config, dir) = test_config();
    let vault = ClinicalVault::new(config).unwrap();
    let (_, session) = vault
        .bootstrap(&AdminCredentials::new("admin", ADMIN_PASSWORD), KEK_PASSWORD)
        .unwrap();

    let store = SqliteStore::open_existing(&vault.config().database_path).unwrap();
    let salt = BASE64.decode(store.read_config(KEK_SALT_KEY).unwrap().unwrap()).unwrap();
    let iterations: u32 = store.read_config(KEK_ITERATIONS_KEY).unwrap().unwrap().parse().unwrap();
    let derived = SecretKey::new(derive_key(KEK_PASSWORD.as_bytes(), &salt, iterations, KEK_SIZE).unwrap());

    // the recomputed key really is the session KEK
    let field = vault.encrypt_field(&session, "MRN 000123").unwrap();
    assert_eq!(decrypt_field(&field.ciphertext, &field.iv, &derived).unwrap(), "MRN 000123");
    vault.logout(session);

    (vault, derived, dir)
}

#[test]
fn test_config_never_holds_derived_kek() {
    let (vault, derived, _dir) = bootstrap_and_recompute_kek();
    let encoded = derived.to_base64();

    let store = SqliteStore::open_existing(&vault.config().database_path).unwrap();
    let entries = store.list_config().unwrap();
    assert!(entries.iter().any(|entry| entry.key == KEK_HASH_KEY));

    for entry in &entries {
        let value = entry.value.clone().unwrap_or_default();
        assert_ne!(value, encoded, "{} holds the base64 KEK", entry.key);
        assert_ne!(value.as_bytes(), derived.as_bytes(), "{} holds the raw KEK", entry.key);
        if let Ok(decoded) = BASE64.decode(&value) {
            assert_ne!(decoded.as_slice(), derived.as_bytes(), "{} decodes to the KEK", entry.key);
        }
    }

    let dump = serde_json::to_string(&entries).unwrap();
    assert!(!dump.contains(&encoded));
}

#[test]
fn test_no_table_holds_derived_kek() {
    let (vault, derived, _dir) = bootstrap_and_recompute_kek();
    let encoded = derived.to_base64();

    let store = SqliteStore::open_existing(&vault.config().database_path).unwrap();
    let mut stmt = store
        .connection()
        .prepare("SELECT value FROM Config UNION ALL SELECT password_hash FROM Users UNION ALL SELECT password_salt FROM Users")
        .unwrap();
    let values: Vec<Option<String>> = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert!(!values.is_empty());
    for value in values.into_iter().flatten() {
        assert!(!value.contains(&encoded));
    }
}
