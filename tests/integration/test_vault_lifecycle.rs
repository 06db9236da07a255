use crate::test_utils::{bootstrapped_vault, test_config, ADMIN_PASSWORD, ADMIN_USERNAME, KEK_PASSWORD};
use clinvault::storage::SqliteStore;
use clinvault::{AdminCredentials, ClinicalVault, ProvisioningState, Role, VaultError};

#[test]
fn test_bootstrap_then_login_cycle() {
    let (config, _dir) = test_config();
    let vault = ClinicalVault::new(config).unwrap();
    assert_eq!(vault.get_state(), ProvisioningState::VirginDatabase);

    let (report, session) = vault
        .bootstrap(
            &AdminCredentials::new(ADMIN_USERNAME, ADMIN_PASSWORD).with_full_name("Ward Administrator"),
            KEK_PASSWORD,
        )
        .unwrap();
    assert_eq!(report.state, ProvisioningState::ProductionReady);
    assert_eq!(
        report.schema.created,
        vec!["Config", "Users", "Patients", "ClinicalRecords", "idx_ClinicalRecords_patient_id"]
    );
    assert!(session.is_unlocked());
    let stored = vault.encrypt_field(&session, "Jane Doe").unwrap();
    vault.logout(session);

    assert_eq!(vault.get_state(), ProvisioningState::ProductionReady);

    let mut session = vault.authenticate(ADMIN_USERNAME, ADMIN_PASSWORD).unwrap();
    assert_eq!(session.role(), Role::Administrator);
    assert!(!session.must_change_password());
    assert!(!session.is_unlocked());

    vault.validate_kek(&mut session, KEK_PASSWORD).unwrap();
    assert_eq!(vault.decrypt_field(&session, &stored).unwrap(), "Jane Doe");
    vault.logout(session);
}

#[test]
fn test_fields_survive_a_new_vault_instance() {
    let (vault, _dir) = bootstrapped_vault();
    let mut session = vault.authenticate(ADMIN_USERNAME, ADMIN_PASSWORD).unwrap();
    vault.validate_kek(&mut session, KEK_PASSWORD).unwrap();
    let stored = vault.encrypt_field(&session, "Type 2 diabetes, metformin 500mg").unwrap();
    vault.logout(session);

    let reopened = ClinicalVault::new(vault.config().clone()).unwrap();
    let mut session = reopened.authenticate(ADMIN_USERNAME, ADMIN_PASSWORD).unwrap();
    reopened.validate_kek(&mut session, KEK_PASSWORD).unwrap();
    assert_eq!(
        reopened.decrypt_field(&session, &stored).unwrap(),
        "Type 2 diabetes, metformin 500mg"
    );
}

#[test]
fn test_same_plaintext_encrypts_differently() {
    let (vault, _dir) = bootstrapped_vault();
    let mut session = vault.authenticate(ADMIN_USERNAME, ADMIN_PASSWORD).unwrap();
    vault.validate_kek(&mut session, KEK_PASSWORD).unwrap();

    let first = vault.encrypt_field(&session, "John Smith").unwrap();
    let second = vault.encrypt_field(&session, "John Smith").unwrap();
    assert_ne!(first.iv, second.iv);
    assert_ne!(first.ciphertext, second.ciphertext);
}

#[test]
fn test_wrong_kek_password_leaves_session_locked() {
    let (vault, _dir) = bootstrapped_vault();
    let mut session = vault.authenticate(ADMIN_USERNAME, ADMIN_PASSWORD).unwrap();

    let result = vault.validate_kek(&mut session, "not the ward passphrase");
    assert!(matches!(result, Err(VaultError::AuthenticationFailure(_))));
    assert!(!session.is_unlocked());
    assert!(vault.encrypt_field(&session, "anything").is_err());
}

#[test]
fn test_bootstrap_refused_once_provisioned() {
    let (vault, _dir) = bootstrapped_vault();
    let result = vault.bootstrap(&AdminCredentials::new("second", ADMIN_PASSWORD), "another kek passphrase");
    assert!(matches!(result, Err(VaultError::Validation(_))));

    // the original KEK still unlocks
    let mut session = vault.authenticate(ADMIN_USERNAME, ADMIN_PASSWORD).unwrap();
    vault.validate_kek(&mut session, KEK_PASSWORD).unwrap();
}

#[test]
fn test_recovery_from_kek_no_admin() {
    let (vault, _dir) = bootstrapped_vault();
    let mut session = vault.authenticate(ADMIN_USERNAME, ADMIN_PASSWORD).unwrap();
    vault.validate_kek(&mut session, KEK_PASSWORD).unwrap();
    let stored = vault.encrypt_field(&session, "Allergic to latex").unwrap();
    vault.logout(session);

    {
        let store = SqliteStore::open_existing(&vault.config().database_path).unwrap();
        store
            .connection()
            .execute("DELETE FROM Users", [])
            .unwrap();
    }
    assert_eq!(vault.get_state(), ProvisioningState::KekNoAdmin);
    assert!(matches!(
        vault.authenticate(ADMIN_USERNAME, ADMIN_PASSWORD),
        Err(VaultError::Configuration(_))
    ));

    let (report, session) = vault
        .provision_administrator(&AdminCredentials::new("recovery", "recovery password"), KEK_PASSWORD)
        .unwrap();
    assert_eq!(report.state, ProvisioningState::ProductionReady);
    assert_eq!(vault.decrypt_field(&session, &stored).unwrap(), "Allergic to latex");
    vault.logout(session);

    assert!(vault.authenticate("recovery", "recovery password").is_ok());
}

#[test]
fn test_corrupted_store_blocks_login() {
    let (vault, _dir) = bootstrapped_vault();
    {
        let store = SqliteStore::open_existing(&vault.config().database_path).unwrap();
        store.write_config(clinvault::KEK_HASH_KEY, " ", None).unwrap();
    }
    assert_eq!(vault.get_state(), ProvisioningState::Corrupted);
    assert!(matches!(
        vault.authenticate(ADMIN_USERNAME, ADMIN_PASSWORD),
        Err(VaultError::CorruptedState(_))
    ));
}
