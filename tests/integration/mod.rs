mod test_vault_lifecycle;
