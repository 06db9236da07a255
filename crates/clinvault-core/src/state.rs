//! Provisioning states of a backing store

use serde::Serialize;
use std::fmt;

/// Where a backing store stands in its provisioning lifecycle
///
/// Always computed from the store, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProvisioningState {
    /// Nothing provisioned yet; `bootstrap` may run
    VirginDatabase,
    /// Some but not all required tables exist
    BootstrapIncomplete,
    /// KEK provisioned but no active administrator
    KekNoAdmin,
    /// Fully provisioned
    ProductionReady,
    /// The store holds data that cannot be interpreted
    Corrupted,
    /// The store could not be examined
    Error,
}

impl ProvisioningState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningState::VirginDatabase => "VirginDatabase",
            ProvisioningState::BootstrapIncomplete => "BootstrapIncomplete",
            ProvisioningState::KekNoAdmin => "KekNoAdmin",
            ProvisioningState::ProductionReady => "ProductionReady",
            ProvisioningState::Corrupted => "Corrupted",
            ProvisioningState::Error => "Error",
        }
    }

    /// States an operator has to repair by hand before anything can proceed
    pub fn requires_manual_recovery(&self) -> bool {
        matches!(
            self,
            ProvisioningState::BootstrapIncomplete | ProvisioningState::Corrupted | ProvisioningState::Error
        )
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
