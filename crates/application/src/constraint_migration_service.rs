use std::sync::Arc;

use tracing::{info, warn};
use vams_core::AppResult;
use vams_domain::denormalize;

use crate::{AccessRecordRepository, AccessTables, LegacyConstraintRepository};

/// Counts produced by a legacy constraint migration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Constraints rewritten in the per-principal format.
    pub migrated: usize,
    /// Constraints that already had per-principal records.
    pub skipped: usize,
    /// Per-principal records written.
    pub records_written: usize,
}

/// Application service rewriting one-item-per-constraint data into
/// per-principal access records.
pub struct ConstraintMigrationService {
    legacy: Arc<dyn LegacyConstraintRepository>,
    access_records: Arc<dyn AccessRecordRepository>,
    tables: AccessTables,
}

impl ConstraintMigrationService {
    /// Creates a new migration service from repository implementations.
    #[must_use]
    pub fn new(
        legacy: Arc<dyn LegacyConstraintRepository>,
        access_records: Arc<dyn AccessRecordRepository>,
        tables: AccessTables,
    ) -> Self {
        Self {
            legacy,
            access_records,
            tables,
        }
    }

    /// Migrates every legacy constraint that has no per-principal records yet.
    pub async fn migrate(&self) -> AppResult<MigrationReport> {
        let mut report = MigrationReport::default();

        for constraint in self.legacy.list_legacy_constraints().await? {
            let existing = self
                .access_records
                .list_access_records_for_constraint(constraint.constraint_id())
                .await?;
            if !existing.is_empty() {
                report.skipped += 1;
                continue;
            }

            let denormalized = denormalize(&constraint);
            if denormalized.used_fallback {
                warn!(
                    constraint_id = %constraint.constraint_id(),
                    "legacy constraint has no permissions; writing a principal-less record"
                );
            }

            for record in denormalized.records {
                let key = self.tables.access_record_key(&record);
                self.access_records.put_access_record(&key, record).await?;
                report.records_written += 1;
            }
            report.migrated += 1;
        }

        info!(
            migrated = report.migrated,
            skipped = report.skipped,
            records_written = report.records_written,
            "legacy constraint migration finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use vams_domain::{
        Constraint, ConstraintAudit, Criteria, CriteriaExpression, CriteriaOperator, ObjectType,
        PermissionEntry, PermissionType, PermissionVerb,
    };

    use crate::fakes::FakeAccessStore;
    use crate::{AccessRecordRepository, AccessTables};

    use super::{ConstraintMigrationService, MigrationReport};

    fn legacy_constraint(id: &str, groups: &[&str], users: &[&str]) -> Constraint {
        let entries = |principals: &[&str]| {
            principals
                .iter()
                .map(|principal| {
                    PermissionEntry::new(
                        format!("{id}-{principal}"),
                        *principal,
                        PermissionVerb::Get,
                        PermissionType::Allow,
                    )
                    .unwrap_or_else(|error| panic!("{error}"))
                })
                .collect::<Vec<_>>()
        };

        Constraint::new(
            id,
            id,
            "legacy",
            ObjectType::Asset,
            Criteria::And(vec![
                CriteriaExpression::new("c1", "databaseId", CriteriaOperator::Contains, ".*")
                    .unwrap_or_else(|error| panic!("{error}")),
            ]),
            entries(groups),
            entries(users),
            ConstraintAudit::created_now("legacy"),
        )
        .unwrap_or_else(|error| panic!("{error}"))
    }

    fn service(store: &Arc<FakeAccessStore>) -> ConstraintMigrationService {
        ConstraintMigrationService::new(store.clone(), store.clone(), AccessTables::default())
    }

    #[tokio::test]
    async fn migrates_each_constraint_into_principal_records() {
        let store = Arc::new(FakeAccessStore::default());
        store.legacy.lock().await.extend([
            legacy_constraint("assets-read", &["readers", "readers"], &["kim"]),
            legacy_constraint("orphan", &[], &[]),
        ]);

        let report = service(&store)
            .migrate()
            .await
            .unwrap_or_else(|error| panic!("{error}"));

        assert_eq!(
            report,
            MigrationReport {
                migrated: 2,
                skipped: 0,
                records_written: 3,
            }
        );
        let records = store
            .list_access_records_for_constraint("assets-read")
            .await
            .unwrap_or_else(|error| panic!("{error}"));
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn migration_is_idempotent() {
        let store = Arc::new(FakeAccessStore::default());
        store
            .legacy
            .lock()
            .await
            .push(legacy_constraint("assets-read", &["readers"], &[]));
        let service = service(&store);

        let first = service
            .migrate()
            .await
            .unwrap_or_else(|error| panic!("{error}"));
        let second = service
            .migrate()
            .await
            .unwrap_or_else(|error| panic!("{error}"));

        assert_eq!(first.migrated, 1);
        assert_eq!(second.migrated, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(store.records.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn write_failure_stops_the_migration() {
        let store = Arc::new(FakeAccessStore::default());
        store
            .legacy
            .lock()
            .await
            .push(legacy_constraint("assets-read", &["readers"], &[]));
        store.fail_writes_for("assets-read#group#readers").await;

        let result = service(&store).migrate().await;

        assert!(result.is_err());
    }
}
