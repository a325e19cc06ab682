//! Application services and ports.

#![forbid(unsafe_code)]

mod access_ports;
mod authorization_service;
mod constraint_migration_service;
mod provisioning_service;

#[cfg(test)]
mod fakes;

pub use access_ports::{
    AccessRecordRepository, AccessTables, LegacyConstraintRepository, RoleRepository,
    UserRepository, UserRoleRepository,
};
pub use authorization_service::{AuthorizationService, Requester, ResolvedAccess};
pub use constraint_migration_service::{ConstraintMigrationService, MigrationReport};
pub use provisioning_service::{
    ADMIN_ROLE_NAME, AdminBootstrap, CatalogDefinitions, PROVISIONING_ACTOR, ProvisioningReport,
    ProvisioningService, ProvisioningState, SeedCatalog, SeedFailure, SeedWrite,
};
