use clinvault::{ClinicalVault, ProvisioningState, VaultConfig};
use std::process::ExitCode;
use tracing::{error, info};

// Reports the provisioning state of the configured store. Exits non-zero
// when the store needs manual recovery.
fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    clinvault::init_logging(&log_level);

    let config = match VaultConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::from(2);
        }
    };
    let vault = match ClinicalVault::new(config) {
        Ok(vault) => vault,
        Err(e) => {
            error!(error = %e, "Cannot create vault");
            return ExitCode::from(2);
        }
    };

    let state = vault.get_state();
    info!(version = clinvault::version(), path = %vault.config().database_path.display(), "clinvault");
    println!("{}", state);

    match state {
        ProvisioningState::VirginDatabase | ProvisioningState::KekNoAdmin | ProvisioningState::ProductionReady => {
            ExitCode::SUCCESS
        }
        _ => ExitCode::FAILURE,
    }
}
