use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use vams_application::{
    AccessRecordRepository, AccessTables, LegacyConstraintRepository, RoleRepository,
    UserRepository, UserRoleRepository,
};
use vams_core::{AppResult, AttributeMap, AttributeValue, PhysicalKey};
use vams_domain::{AccessRecord, Constraint, Principal, Role, UserRecord, UserRoleAssignment};

use crate::record_codec::{
    GROUP_ID, USER_ID, decode_access_record, decode_legacy_constraint, decode_role, decode_user,
    decode_user_role, encode_access_record, encode_role, encode_user, encode_user_role,
};

/// In-memory access-control store keeping encoded items per table and key.
#[derive(Debug)]
pub struct InMemoryAccessStore {
    tables: AccessTables,
    items: RwLock<HashMap<(String, PhysicalKey), AttributeMap>>,
    legacy_items: RwLock<Vec<AttributeMap>>,
}

impl InMemoryAccessStore {
    /// Creates an empty store for the given tables.
    #[must_use]
    pub fn new(tables: AccessTables) -> Self {
        Self {
            tables,
            items: RwLock::new(HashMap::new()),
            legacy_items: RwLock::new(Vec::new()),
        }
    }

    /// Adds an item in the one-item-per-constraint format.
    pub async fn insert_legacy_item(&self, item: AttributeMap) {
        self.legacy_items.write().await.push(item);
    }

    /// Returns the number of items stored in `table`.
    pub async fn item_count(&self, table: &str) -> usize {
        self.items
            .read()
            .await
            .keys()
            .filter(|(stored_table, _)| stored_table == table)
            .count()
    }

    async fn put(&self, table: &str, key: &PhysicalKey, item: AttributeMap) {
        self.items
            .write()
            .await
            .insert((table.to_owned(), key.clone()), item);
    }

    async fn scan<T>(
        &self,
        table: &str,
        filter: impl Fn(&AttributeMap) -> bool,
        decode: impl Fn(&AttributeMap) -> AppResult<T>,
    ) -> AppResult<Vec<T>> {
        let items = self.items.read().await;
        let mut matching: Vec<(&PhysicalKey, &AttributeMap)> = items
            .iter()
            .filter(|((stored_table, _), item)| stored_table == table && filter(item))
            .map(|((_, key), item)| (key, item))
            .collect();
        matching.sort_by(|left, right| left.0.cmp(right.0));

        matching.into_iter().map(|(_, item)| decode(item)).collect()
    }
}

impl Default for InMemoryAccessStore {
    fn default() -> Self {
        Self::new(AccessTables::default())
    }
}

fn has_s(item: &AttributeMap, name: &str, expected: &str) -> bool {
    item.get(name).and_then(AttributeValue::as_s) == Some(expected)
}

#[async_trait]
impl RoleRepository for InMemoryAccessStore {
    async fn put_role(&self, key: &PhysicalKey, role: Role) -> AppResult<()> {
        self.put(self.tables.roles.as_str(), key, encode_role(&role))
            .await;
        Ok(())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        self.scan(self.tables.roles.as_str(), |_| true, decode_role)
            .await
    }
}

#[async_trait]
impl AccessRecordRepository for InMemoryAccessStore {
    async fn put_access_record(&self, key: &PhysicalKey, record: AccessRecord) -> AppResult<()> {
        let item = encode_access_record(&record)?;
        self.put(self.tables.constraints.as_str(), key, item).await;
        Ok(())
    }

    async fn list_access_records_for_principal(
        &self,
        principal: &Principal,
    ) -> AppResult<Vec<AccessRecord>> {
        let (attribute, id) = match principal {
            Principal::Group(group_id) => (GROUP_ID, group_id.as_str()),
            Principal::User(user_id) => (USER_ID, user_id.as_str()),
        };

        self.scan(
            self.tables.constraints.as_str(),
            |item| has_s(item, attribute, id),
            decode_access_record,
        )
        .await
    }

    async fn list_access_records_for_constraint(
        &self,
        base_constraint_id: &str,
    ) -> AppResult<Vec<AccessRecord>> {
        let records = self
            .scan(
                self.tables.constraints.as_str(),
                |_| true,
                decode_access_record,
            )
            .await?;

        Ok(records
            .into_iter()
            .filter(|record| record.base_constraint_id() == base_constraint_id)
            .collect())
    }
}

#[async_trait]
impl UserRepository for InMemoryAccessStore {
    async fn put_user(&self, key: &PhysicalKey, user: UserRecord) -> AppResult<()> {
        self.put(self.tables.users.as_str(), key, encode_user(&user))
            .await;
        Ok(())
    }

    async fn find_user(&self, user_id: &str) -> AppResult<Option<UserRecord>> {
        Ok(self
            .scan(
                self.tables.users.as_str(),
                |item| has_s(item, USER_ID, user_id),
                decode_user,
            )
            .await?
            .into_iter()
            .next())
    }
}

#[async_trait]
impl UserRoleRepository for InMemoryAccessStore {
    async fn put_user_role(
        &self,
        key: &PhysicalKey,
        assignment: UserRoleAssignment,
    ) -> AppResult<()> {
        self.put(
            self.tables.user_roles.as_str(),
            key,
            encode_user_role(&assignment),
        )
        .await;
        Ok(())
    }

    async fn list_roles_for_user(&self, user_id: &str) -> AppResult<Vec<UserRoleAssignment>> {
        self.scan(
            self.tables.user_roles.as_str(),
            |item| has_s(item, USER_ID, user_id),
            decode_user_role,
        )
        .await
    }
}

#[async_trait]
impl LegacyConstraintRepository for InMemoryAccessStore {
    async fn list_legacy_constraints(&self) -> AppResult<Vec<Constraint>> {
        let now = Utc::now();
        self.legacy_items
            .read()
            .await
            .iter()
            .map(|item| decode_legacy_constraint(item, now))
            .collect()
    }
}

#[cfg(test)]
mod tests;
