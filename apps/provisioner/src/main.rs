//! VAMS access-control provisioner.

#![forbid(unsafe_code)]

mod provisioner_config;

use std::fs;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use vams_application::{
    AccessRecordRepository, AuthorizationService, ConstraintMigrationService,
    LegacyConstraintRepository, ProvisioningService, Requester, RoleRepository, SeedCatalog,
    UserRepository, UserRoleRepository,
};
use vams_core::AppError;
use vams_infrastructure::{InMemoryAccessStore, PostgresAccessStore};

use crate::provisioner_config::{
    AccessCheck, ProvisionerCommand, ProvisionerConfig, StoreBackend, init_tracing,
};

struct AccessStores {
    roles: Arc<dyn RoleRepository>,
    access_records: Arc<dyn AccessRecordRepository>,
    users: Arc<dyn UserRepository>,
    user_roles: Arc<dyn UserRoleRepository>,
    legacy: Arc<dyn LegacyConstraintRepository>,
}

impl AccessStores {
    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: RoleRepository
            + AccessRecordRepository
            + UserRepository
            + UserRoleRepository
            + LegacyConstraintRepository
            + 'static,
    {
        Self {
            roles: store.clone(),
            access_records: store.clone(),
            users: store.clone(),
            user_roles: store.clone(),
            legacy: store,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ProvisionerConfig::load()?;

    let stores = match &config.store_backend {
        StoreBackend::Memory => {
            warn!("using the in-memory store; nothing outlives this process");
            AccessStores::from_store(Arc::new(InMemoryAccessStore::new(config.tables.clone())))
        }
        StoreBackend::Postgres { database_url } => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to connect to database: {error}"))
                })?;

            sqlx::migrate!("../../crates/infrastructure/migrations")
                .run(&pool)
                .await
                .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

            if config.command == ProvisionerCommand::Migrate {
                info!("database migrations applied successfully");
                return Ok(());
            }

            AccessStores::from_store(Arc::new(PostgresAccessStore::new(
                pool,
                config.tables.clone(),
            )))
        }
    };

    match &config.command {
        ProvisionerCommand::Provision => provision(&config, &stores).await,
        ProvisionerCommand::Migrate => Ok(()),
        ProvisionerCommand::MigrateLegacy => {
            let report = ConstraintMigrationService::new(
                stores.legacy.clone(),
                stores.access_records.clone(),
                config.tables.clone(),
            )
            .migrate()
            .await?;
            info!(
                migrated = report.migrated,
                skipped = report.skipped,
                "legacy constraints migrated"
            );
            Ok(())
        }
        ProvisionerCommand::Check(check) => {
            if config.store_backend == StoreBackend::Memory {
                provision(&config, &stores).await?;
            }
            check_access(&config, &stores, check).await
        }
    }
}

async fn provision(config: &ProvisionerConfig, stores: &AccessStores) -> Result<(), AppError> {
    let catalog = match &config.seed_catalog_path {
        Some(path) => {
            let document = fs::read_to_string(path).map_err(|error| {
                AppError::Validation(format!(
                    "failed to read seed catalog '{}': {error}",
                    path.display()
                ))
            })?;
            SeedCatalog::from_json(document.as_str())?
        }
        None => SeedCatalog::default_catalog()?,
    };

    let service = ProvisioningService::new(
        stores.roles.clone(),
        stores.access_records.clone(),
        stores.users.clone(),
        stores.user_roles.clone(),
        config.tables.clone(),
    );

    let report = service
        .provision(&catalog, config.admin.as_ref())
        .await?
        .into_result()?;
    info!(
        written = report.written.len(),
        state = service.state()?.as_str(),
        "access control provisioned"
    );

    Ok(())
}

async fn check_access(
    config: &ProvisionerConfig,
    stores: &AccessStores,
    check: &AccessCheck,
) -> Result<(), AppError> {
    let service = AuthorizationService::new(
        stores.access_records.clone(),
        stores.roles.clone(),
        stores.user_roles.clone(),
        config.precedence_policy,
    );
    let requester = Requester::new(check.user_id.as_str(), check.mfa_enabled);

    let decision = service
        .evaluate(&requester, &check.resource, check.verb)
        .await?;
    info!(
        user_id = %check.user_id,
        verb = %check.verb,
        policy = config.precedence_policy.as_str(),
        decision = ?decision,
        "access check"
    );

    if decision.is_allowed() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "user '{}' may not {} this resource",
            check.user_id, check.verb
        )))
    }
}
