use std::sync::Arc;

use vams_application::{
    AccessRecordRepository, AccessTables, AdminBootstrap, AuthorizationService,
    ConstraintMigrationService, ProvisioningService, Requester, RoleRepository, SeedCatalog,
    UserRepository,
};
use vams_domain::{
    AccessDecision, Constraint, ConstraintAudit, Criteria, CriteriaExpression, CriteriaOperator,
    ObjectType, PermissionEntry, PermissionType, PermissionVerb, PrecedencePolicy, Principal,
    ResourceAttributes,
};

use super::InMemoryAccessStore;
use crate::record_codec::encode_legacy_constraint;

fn provisioning(store: &Arc<InMemoryAccessStore>) -> ProvisioningService {
    ProvisioningService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        AccessTables::default(),
    )
}

fn admin() -> AdminBootstrap {
    AdminBootstrap {
        user_id: "root".to_owned(),
        email: "root@example.com".to_owned(),
    }
}

#[tokio::test]
async fn seeded_store_serves_principal_lookups() {
    let store = Arc::new(InMemoryAccessStore::default());
    let catalog = SeedCatalog::default_catalog().unwrap_or_else(|error| panic!("{error}"));
    provisioning(&store)
        .provision(&catalog, Some(&admin()))
        .await
        .unwrap_or_else(|error| panic!("{error}"))
        .into_result()
        .unwrap_or_else(|error| panic!("{error}"));

    let roles = store
        .list_roles()
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    assert_eq!(roles.len(), 3);

    let admin_records = store
        .list_access_records_for_principal(&Principal::Group("admin".to_owned()))
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    assert!(!admin_records.is_empty());
    assert!(
        admin_records
            .iter()
            .all(|record| record.record_id().ends_with("#group#admin"))
    );

    let user = store
        .find_user("root")
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    assert!(user.is_some());
}

#[tokio::test]
async fn reprovisioning_keeps_item_counts() {
    let store = Arc::new(InMemoryAccessStore::default());
    let catalog = SeedCatalog::default_catalog().unwrap_or_else(|error| panic!("{error}"));
    let service = provisioning(&store);
    let tables = AccessTables::default();

    service
        .provision(&catalog, Some(&admin()))
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    let constraints = store.item_count(tables.constraints.as_str()).await;
    let roles = store.item_count(tables.roles.as_str()).await;

    service
        .provision(&catalog, Some(&admin()))
        .await
        .unwrap_or_else(|error| panic!("{error}"));

    assert_eq!(store.item_count(tables.constraints.as_str()).await, constraints);
    assert_eq!(store.item_count(tables.roles.as_str()).await, roles);
    assert_eq!(store.item_count(tables.users.as_str()).await, 1);
    assert_eq!(store.item_count(tables.user_roles.as_str()).await, 1);
}

#[tokio::test]
async fn seeded_admin_is_allowed_through_the_store() {
    let store = Arc::new(InMemoryAccessStore::default());
    let catalog = SeedCatalog::default_catalog().unwrap_or_else(|error| panic!("{error}"));
    provisioning(&store)
        .provision(&catalog, Some(&admin()))
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    let authorization = AuthorizationService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        PrecedencePolicy::DenyOverrides,
    );

    let decision = authorization
        .evaluate(
            &Requester::new("root", false),
            &ResourceAttributes::for_object(ObjectType::Database).with_text("databaseId", "db-7"),
            PermissionVerb::Delete,
        )
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    assert_eq!(decision, AccessDecision::Allow);

    let stranger = authorization
        .evaluate(
            &Requester::new("nobody", true),
            &ResourceAttributes::web_route("/assets"),
            PermissionVerb::Get,
        )
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    assert_eq!(stranger, AccessDecision::NotApplicable);
}

#[tokio::test]
async fn legacy_items_migrate_once() {
    let store = Arc::new(InMemoryAccessStore::default());
    let constraint = Constraint::new(
        "pipelines-run",
        "pipelines run",
        "run pipelines",
        ObjectType::Pipeline,
        Criteria::And(vec![
            CriteriaExpression::new("c1", "pipelineId", CriteriaOperator::StartsWith, "conv-")
                .unwrap_or_else(|error| panic!("{error}")),
        ]),
        vec![
            PermissionEntry::new("p1", "pipeline", PermissionVerb::Post, PermissionType::Allow)
                .unwrap_or_else(|error| panic!("{error}")),
        ],
        vec![
            PermissionEntry::new("p2", "lee", PermissionVerb::Post, PermissionType::Allow)
                .unwrap_or_else(|error| panic!("{error}")),
        ],
        ConstraintAudit::created_now("legacy"),
    )
    .unwrap_or_else(|error| panic!("{error}"));
    store
        .insert_legacy_item(encode_legacy_constraint(&constraint))
        .await;
    let service =
        ConstraintMigrationService::new(store.clone(), store.clone(), AccessTables::default());

    let first = service
        .migrate()
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    let second = service
        .migrate()
        .await
        .unwrap_or_else(|error| panic!("{error}"));

    assert_eq!((first.migrated, first.records_written), (1, 2));
    assert_eq!((second.migrated, second.skipped), (0, 1));

    let records = store
        .list_access_records_for_constraint("pipelines-run")
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| record.constraint() == &constraint));
}
