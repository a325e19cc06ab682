use std::sync::{Arc, Mutex};

use vams_core::{AppError, AppResult};

use crate::{
    AccessRecordRepository, AccessTables, RoleRepository, UserRepository, UserRoleRepository,
};

pub use catalog::{CatalogDefinitions, PROVISIONING_ACTOR, SeedCatalog};
pub use report::{ProvisioningReport, SeedFailure, SeedWrite};

/// Role granted to the bootstrap administrator.
pub const ADMIN_ROLE_NAME: &str = "admin";

/// Lifecycle of a provisioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningState {
    /// No run has started.
    NotProvisioned,
    /// A run is writing records.
    Provisioning,
    /// The last run finished.
    Provisioned,
}

impl ProvisioningState {
    /// Returns stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotProvisioned => "not_provisioned",
            Self::Provisioning => "provisioning",
            Self::Provisioned => "provisioned",
        }
    }
}

/// Administrator created alongside the seeded roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminBootstrap {
    /// User identifier of the administrator.
    pub user_id: String,
    /// Contact email of the administrator.
    pub email: String,
}

/// Application service seeding default roles and constraints.
///
/// Every item is written under a deterministic key, so re-running with an
/// unchanged catalog overwrites the same records instead of adding new ones.
pub struct ProvisioningService {
    roles: Arc<dyn RoleRepository>,
    access_records: Arc<dyn AccessRecordRepository>,
    users: Arc<dyn UserRepository>,
    user_roles: Arc<dyn UserRoleRepository>,
    tables: AccessTables,
    state: Mutex<ProvisioningState>,
}

impl ProvisioningService {
    /// Creates a new provisioning service from repository implementations.
    #[must_use]
    pub fn new(
        roles: Arc<dyn RoleRepository>,
        access_records: Arc<dyn AccessRecordRepository>,
        users: Arc<dyn UserRepository>,
        user_roles: Arc<dyn UserRoleRepository>,
        tables: AccessTables,
    ) -> Self {
        Self {
            roles,
            access_records,
            users,
            user_roles,
            tables,
            state: Mutex::new(ProvisioningState::NotProvisioned),
        }
    }

    /// Returns the table names keys are derived from.
    #[must_use]
    pub fn tables(&self) -> &AccessTables {
        &self.tables
    }

    /// Returns the state of the latest run.
    pub fn state(&self) -> AppResult<ProvisioningState> {
        self.state
            .lock()
            .map(|state| *state)
            .map_err(|error| AppError::Internal(format!("provisioning state poisoned: {error}")))
    }

    fn transition(&self, next: ProvisioningState) -> AppResult<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|error| AppError::Internal(format!("provisioning state poisoned: {error}")))?;
        *state = next;
        Ok(())
    }
}

mod catalog;
mod report;
mod seeding;
