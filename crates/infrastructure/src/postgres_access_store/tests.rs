use chrono::Utc;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use vams_application::{
    AccessRecordRepository, AccessTables, LegacyConstraintRepository, RoleRepository,
    UserRoleRepository,
};
use vams_domain::{
    Constraint, ConstraintAudit, Criteria, CriteriaExpression, CriteriaOperator, ObjectType,
    PermissionEntry, PermissionType, PermissionVerb, Principal, Role, RoleSource,
    UserRoleAssignment, denormalize,
};

use super::PostgresAccessStore;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres access store tests: {error}");
    }

    Some(pool)
}

fn isolated_tables() -> AccessTables {
    let suffix = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    AccessTables {
        roles: format!("roles-{suffix}"),
        constraints: format!("constraints-{suffix}"),
        users: format!("users-{suffix}"),
        user_roles: format!("user-roles-{suffix}"),
    }
}

fn shared_constraint(id: &str) -> Constraint {
    Constraint::new(
        id,
        id,
        "shared database",
        ObjectType::Database,
        Criteria::Or(vec![
            CriteriaExpression::new("c1", "databaseId", CriteriaOperator::IsOneOf, "db1")
                .unwrap_or_else(|error| panic!("{error}")),
        ]),
        vec![
            PermissionEntry::new("p1", "readers", PermissionVerb::Get, PermissionType::Allow)
                .unwrap_or_else(|error| panic!("{error}")),
        ],
        vec![
            PermissionEntry::new("p2", "mia", PermissionVerb::Put, PermissionType::Deny)
                .unwrap_or_else(|error| panic!("{error}")),
        ],
        ConstraintAudit::created_now("test"),
    )
    .unwrap_or_else(|error| panic!("{error}"))
}

#[tokio::test]
async fn access_records_are_upserted_and_indexed() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let tables = isolated_tables();
    let store = PostgresAccessStore::new(pool, tables.clone());
    let constraint = shared_constraint("shared-db");

    for _ in 0..2 {
        for record in denormalize(&constraint).records {
            let key = tables.access_record_key(&record);
            let written = store.put_access_record(&key, record).await;
            assert!(written.is_ok());
        }
    }

    let for_constraint = store
        .list_access_records_for_constraint("shared-db")
        .await
        .unwrap_or_default();
    assert_eq!(for_constraint.len(), 2);

    let for_group = store
        .list_access_records_for_principal(&Principal::Group("readers".to_owned()))
        .await
        .unwrap_or_default();
    assert_eq!(for_group.len(), 1);
    assert_eq!(for_group[0].record_id(), "shared-db#group#readers");

    let for_user = store
        .list_access_records_for_principal(&Principal::User("mia".to_owned()))
        .await
        .unwrap_or_default();
    assert_eq!(for_user.len(), 1);
    assert_eq!(for_user[0].constraint(), &constraint);
}

#[tokio::test]
async fn roles_and_assignments_are_scoped_by_table() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let tables = isolated_tables();
    let store = PostgresAccessStore::new(pool.clone(), tables.clone());
    let other = PostgresAccessStore::new(pool, isolated_tables());

    let role = Role::new(
        "pipeline",
        "pipelines",
        Some(RoleSource::InternalSystem),
        false,
        Utc::now(),
    )
    .unwrap_or_else(|error| panic!("{error}"));
    let stored = store.put_role(&tables.role_key(&role), role).await;
    assert!(stored.is_ok());

    let assignment = UserRoleAssignment::new("nia", "pipeline", Utc::now())
        .unwrap_or_else(|error| panic!("{error}"));
    let assigned = store
        .put_user_role(&tables.user_role_key(&assignment), assignment)
        .await;
    assert!(assigned.is_ok());

    assert_eq!(store.list_roles().await.unwrap_or_default().len(), 1);
    assert_eq!(
        store
            .list_roles_for_user("nia")
            .await
            .unwrap_or_default()
            .len(),
        1
    );
    assert!(other.list_roles_for_user("nia").await.is_ok_and(|roles| roles.is_empty()));
}

#[tokio::test]
async fn legacy_constraints_are_decoded() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let store = PostgresAccessStore::new(pool, isolated_tables());
    let id = format!("legacy-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());
    let constraint = shared_constraint(id.as_str());

    let inserted = store.insert_legacy_constraint(&constraint).await;
    assert!(inserted.is_ok());

    let legacy = store.list_legacy_constraints().await.unwrap_or_default();
    assert!(legacy.iter().any(|stored| stored == &constraint));
}
