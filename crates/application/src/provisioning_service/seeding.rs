use chrono::Utc;
use tracing::{info, warn};
use vams_core::AppResult;
use vams_domain::{UserRecord, UserRoleAssignment, denormalize};

use super::{
    ADMIN_ROLE_NAME, AdminBootstrap, ProvisioningReport, ProvisioningService, ProvisioningState,
    SeedCatalog,
};

impl ProvisioningService {
    /// Seeds the catalog's roles and constraints plus the optional administrator.
    ///
    /// The catalog is validated as a whole before anything is written. Writes
    /// are then independent: a failing item is recorded in the report and the
    /// remaining items are still attempted.
    pub async fn provision(
        &self,
        catalog: &SeedCatalog,
        admin: Option<&AdminBootstrap>,
    ) -> AppResult<ProvisioningReport> {
        let now = Utc::now();
        let definitions = catalog.to_definitions(now)?;
        let admin_records = match admin {
            Some(admin) => Some((
                UserRecord::new(admin.user_id.as_str(), admin.email.as_str(), now)?,
                UserRoleAssignment::new(admin.user_id.as_str(), ADMIN_ROLE_NAME, now)?,
            )),
            None => None,
        };

        self.transition(ProvisioningState::Provisioning)?;
        let mut report = ProvisioningReport::default();

        for role in definitions.roles {
            let key = self.tables.role_key(&role);
            let outcome = self.roles.put_role(&key, role).await;
            report.record(self.tables.roles.as_str(), key, outcome);
        }

        for constraint in &definitions.constraints {
            let denormalized = denormalize(constraint);
            if denormalized.used_fallback {
                warn!(
                    constraint_id = %constraint.constraint_id(),
                    "constraint has no permissions; writing a principal-less record"
                );
            }

            for record in denormalized.records {
                let key = self.tables.access_record_key(&record);
                let outcome = self.access_records.put_access_record(&key, record).await;
                report.record(self.tables.constraints.as_str(), key, outcome);
            }
        }

        if let Some((user, assignment)) = admin_records {
            let key = self.tables.user_key(&user);
            let outcome = self.users.put_user(&key, user).await;
            report.record(self.tables.users.as_str(), key, outcome);

            let key = self.tables.user_role_key(&assignment);
            let outcome = self.user_roles.put_user_role(&key, assignment).await;
            report.record(self.tables.user_roles.as_str(), key, outcome);
        }

        self.transition(ProvisioningState::Provisioned)?;

        for failure in &report.failures {
            warn!(
                table = %failure.table,
                key = %failure.key,
                error = %failure.error,
                "seed write failed"
            );
        }
        info!(
            roles = catalog.role_count(),
            constraints = catalog.constraint_count(),
            written = report.written.len(),
            failed = report.failures.len(),
            "provisioning finished"
        );

        Ok(report)
    }
}
