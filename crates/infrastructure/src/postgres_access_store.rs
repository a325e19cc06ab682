use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::debug;
use vams_application::{
    AccessRecordRepository, AccessTables, LegacyConstraintRepository, RoleRepository,
    UserRepository, UserRoleRepository,
};
use vams_core::{AppError, AppResult, AttributeMap, PhysicalKey};
use vams_domain::{AccessRecord, Constraint, Principal, Role, UserRecord, UserRoleAssignment};

use crate::record_codec::{
    decode_access_record, decode_legacy_constraint, decode_role, decode_user, decode_user_role,
    encode_access_record, encode_legacy_constraint, encode_role, encode_user, encode_user_role,
};

/// PostgreSQL-backed access-control store.
///
/// Every logical table shares `access_items`; the `group_id`, `user_id` and
/// `base_constraint_id` columns serve the lookups the ports need.
#[derive(Clone)]
pub struct PostgresAccessStore {
    pool: PgPool,
    tables: AccessTables,
}

#[derive(Debug, Default)]
struct ItemIndex<'a> {
    group_id: Option<&'a str>,
    user_id: Option<&'a str>,
    base_constraint_id: Option<&'a str>,
}

#[derive(Debug, FromRow)]
struct ItemRow {
    item: Json<AttributeMap>,
}

impl PostgresAccessStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool, tables: AccessTables) -> Self {
        Self { pool, tables }
    }

    /// Stores an item in the one-item-per-constraint format.
    pub async fn insert_legacy_constraint(&self, constraint: &Constraint) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO legacy_constraints (constraint_id, item)
            VALUES ($1, $2)
            ON CONFLICT (constraint_id) DO UPDATE SET item = EXCLUDED.item
            "#,
        )
        .bind(constraint.constraint_id())
        .bind(Json(encode_legacy_constraint(constraint)))
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to store legacy constraint '{}': {error}",
                constraint.constraint_id()
            ))
        })?;

        Ok(())
    }

    async fn upsert(
        &self,
        table: &str,
        key: &PhysicalKey,
        index: ItemIndex<'_>,
        item: AttributeMap,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO access_items (table_name, item_key, group_id, user_id, base_constraint_id, item)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (table_name, item_key) DO UPDATE
            SET group_id = EXCLUDED.group_id,
                user_id = EXCLUDED.user_id,
                base_constraint_id = EXCLUDED.base_constraint_id,
                item = EXCLUDED.item,
                updated_at = now()
            "#,
        )
        .bind(table)
        .bind(key.as_str())
        .bind(index.group_id)
        .bind(index.user_id)
        .bind(index.base_constraint_id)
        .bind(Json(item))
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to write item '{key}' to '{table}': {error}"))
        })?;

        debug!(table, key = %key, "upserted access item");
        Ok(())
    }

    async fn items_in(&self, table: &str) -> AppResult<Vec<AttributeMap>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT item
            FROM access_items
            WHERE table_name = $1
            ORDER BY item_key
            "#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to read items from '{table}': {error}"))
        })?;

        Ok(rows.into_iter().map(|row| row.item.0).collect())
    }

    async fn items_where(
        &self,
        table: &str,
        column: IndexColumn,
        value: &str,
    ) -> AppResult<Vec<AttributeMap>> {
        let statement = format!(
            "SELECT item FROM access_items WHERE table_name = $1 AND {} = $2 ORDER BY item_key",
            column.as_str()
        );

        let rows = sqlx::query_as::<_, ItemRow>(statement.as_str())
            .bind(table)
            .bind(value)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to read items from '{table}' by {}: {error}",
                    column.as_str()
                ))
            })?;

        Ok(rows.into_iter().map(|row| row.item.0).collect())
    }
}

#[derive(Debug, Clone, Copy)]
enum IndexColumn {
    GroupId,
    UserId,
    BaseConstraintId,
}

impl IndexColumn {
    fn as_str(self) -> &'static str {
        match self {
            Self::GroupId => "group_id",
            Self::UserId => "user_id",
            Self::BaseConstraintId => "base_constraint_id",
        }
    }
}

#[async_trait]
impl RoleRepository for PostgresAccessStore {
    async fn put_role(&self, key: &PhysicalKey, role: Role) -> AppResult<()> {
        self.upsert(
            self.tables.roles.as_str(),
            key,
            ItemIndex::default(),
            encode_role(&role),
        )
        .await
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        self.items_in(self.tables.roles.as_str())
            .await?
            .iter()
            .map(decode_role)
            .collect()
    }
}

#[async_trait]
impl AccessRecordRepository for PostgresAccessStore {
    async fn put_access_record(&self, key: &PhysicalKey, record: AccessRecord) -> AppResult<()> {
        let item = encode_access_record(&record)?;
        let index = ItemIndex {
            group_id: match record.principal() {
                Some(Principal::Group(group_id)) => Some(group_id.as_str()),
                _ => None,
            },
            user_id: match record.principal() {
                Some(Principal::User(user_id)) => Some(user_id.as_str()),
                _ => None,
            },
            base_constraint_id: Some(record.base_constraint_id()),
        };

        self.upsert(self.tables.constraints.as_str(), key, index, item)
            .await
    }

    async fn list_access_records_for_principal(
        &self,
        principal: &Principal,
    ) -> AppResult<Vec<AccessRecord>> {
        let column = match principal {
            Principal::Group(_) => IndexColumn::GroupId,
            Principal::User(_) => IndexColumn::UserId,
        };

        self.items_where(
            self.tables.constraints.as_str(),
            column,
            principal.id(),
        )
        .await?
        .iter()
        .map(decode_access_record)
        .collect()
    }

    async fn list_access_records_for_constraint(
        &self,
        base_constraint_id: &str,
    ) -> AppResult<Vec<AccessRecord>> {
        self.items_where(
            self.tables.constraints.as_str(),
            IndexColumn::BaseConstraintId,
            base_constraint_id,
        )
        .await?
        .iter()
        .map(decode_access_record)
        .collect()
    }
}

#[async_trait]
impl UserRepository for PostgresAccessStore {
    async fn put_user(&self, key: &PhysicalKey, user: UserRecord) -> AppResult<()> {
        let index = ItemIndex {
            user_id: Some(user.user_id()),
            ..ItemIndex::default()
        };

        self.upsert(self.tables.users.as_str(), key, index, encode_user(&user))
            .await
    }

    async fn find_user(&self, user_id: &str) -> AppResult<Option<UserRecord>> {
        self.items_where(self.tables.users.as_str(), IndexColumn::UserId, user_id)
            .await?
            .first()
            .map(decode_user)
            .transpose()
    }
}

#[async_trait]
impl UserRoleRepository for PostgresAccessStore {
    async fn put_user_role(
        &self,
        key: &PhysicalKey,
        assignment: UserRoleAssignment,
    ) -> AppResult<()> {
        let index = ItemIndex {
            user_id: Some(assignment.user_id()),
            ..ItemIndex::default()
        };

        self.upsert(
            self.tables.user_roles.as_str(),
            key,
            index,
            encode_user_role(&assignment),
        )
        .await
    }

    async fn list_roles_for_user(&self, user_id: &str) -> AppResult<Vec<UserRoleAssignment>> {
        self.items_where(
            self.tables.user_roles.as_str(),
            IndexColumn::UserId,
            user_id,
        )
        .await?
        .iter()
        .map(decode_user_role)
        .collect()
    }
}

#[async_trait]
impl LegacyConstraintRepository for PostgresAccessStore {
    async fn list_legacy_constraints(&self) -> AppResult<Vec<Constraint>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT item
            FROM legacy_constraints
            ORDER BY constraint_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load legacy constraints: {error}"))
        })?;

        let now = Utc::now();
        rows.iter()
            .map(|row| decode_legacy_constraint(&row.item.0, now))
            .collect()
    }
}

#[cfg(test)]
mod tests;
