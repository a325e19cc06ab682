use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use vams_core::{AppError, AppResult, PhysicalKey};
use vams_domain::{AccessRecord, Constraint, Principal, Role, UserRecord, UserRoleAssignment};

use crate::{
    AccessRecordRepository, LegacyConstraintRepository, RoleRepository, UserRepository,
    UserRoleRepository,
};

/// Repository double backing every access port, with injectable write failures.
#[derive(Default)]
pub(crate) struct FakeAccessStore {
    pub roles: Mutex<BTreeMap<PhysicalKey, Role>>,
    pub records: Mutex<BTreeMap<PhysicalKey, AccessRecord>>,
    pub users: Mutex<BTreeMap<PhysicalKey, UserRecord>>,
    pub user_roles: Mutex<BTreeMap<PhysicalKey, UserRoleAssignment>>,
    pub legacy: Mutex<Vec<Constraint>>,
    failing_slugs: Mutex<BTreeSet<String>>,
    pub put_calls: Mutex<usize>,
}

impl FakeAccessStore {
    pub async fn fail_writes_for(&self, slug: &str) {
        self.failing_slugs.lock().await.insert(slug.to_owned());
    }

    async fn check_write(&self, key: &PhysicalKey) -> AppResult<()> {
        *self.put_calls.lock().await += 1;
        let slug = key
            .as_str()
            .rsplit_once('-')
            .map_or(key.as_str(), |(slug, _)| slug);
        if self.failing_slugs.lock().await.contains(slug) {
            return Err(AppError::Internal(format!("write rejected for {key}")));
        }
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for FakeAccessStore {
    async fn put_role(&self, key: &PhysicalKey, role: Role) -> AppResult<()> {
        self.check_write(key).await?;
        self.roles.lock().await.insert(key.clone(), role);
        Ok(())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        Ok(self.roles.lock().await.values().cloned().collect())
    }
}

#[async_trait]
impl AccessRecordRepository for FakeAccessStore {
    async fn put_access_record(&self, key: &PhysicalKey, record: AccessRecord) -> AppResult<()> {
        self.check_write(key).await?;
        self.records.lock().await.insert(key.clone(), record);
        Ok(())
    }

    async fn list_access_records_for_principal(
        &self,
        principal: &Principal,
    ) -> AppResult<Vec<AccessRecord>> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .filter(|record| record.principal() == Some(principal))
            .cloned()
            .collect())
    }

    async fn list_access_records_for_constraint(
        &self,
        base_constraint_id: &str,
    ) -> AppResult<Vec<AccessRecord>> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .filter(|record| record.base_constraint_id() == base_constraint_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserRepository for FakeAccessStore {
    async fn put_user(&self, key: &PhysicalKey, user: UserRecord) -> AppResult<()> {
        self.check_write(key).await?;
        self.users.lock().await.insert(key.clone(), user);
        Ok(())
    }

    async fn find_user(&self, user_id: &str) -> AppResult<Option<UserRecord>> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|user| user.user_id() == user_id)
            .cloned())
    }
}

#[async_trait]
impl UserRoleRepository for FakeAccessStore {
    async fn put_user_role(
        &self,
        key: &PhysicalKey,
        assignment: UserRoleAssignment,
    ) -> AppResult<()> {
        self.check_write(key).await?;
        self.user_roles.lock().await.insert(key.clone(), assignment);
        Ok(())
    }

    async fn list_roles_for_user(&self, user_id: &str) -> AppResult<Vec<UserRoleAssignment>> {
        Ok(self
            .user_roles
            .lock()
            .await
            .values()
            .filter(|assignment| assignment.user_id() == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LegacyConstraintRepository for FakeAccessStore {
    async fn list_legacy_constraints(&self) -> AppResult<Vec<Constraint>> {
        Ok(self.legacy.lock().await.clone())
    }
}
