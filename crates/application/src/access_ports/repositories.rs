use async_trait::async_trait;

use vams_core::{AppResult, PhysicalKey};
use vams_domain::{AccessRecord, Constraint, Principal, Role, UserRecord, UserRoleAssignment};

/// Repository port for role records.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Writes a role under `key`, replacing any previous item with that key.
    async fn put_role(&self, key: &PhysicalKey, role: Role) -> AppResult<()>;

    /// Lists every stored role.
    async fn list_roles(&self) -> AppResult<Vec<Role>>;
}

/// Repository port for denormalized per-principal constraint records.
#[async_trait]
pub trait AccessRecordRepository: Send + Sync {
    /// Writes a record under `key`, replacing any previous item with that key.
    async fn put_access_record(&self, key: &PhysicalKey, record: AccessRecord) -> AppResult<()>;

    /// Lists records indexed under a group or user principal.
    async fn list_access_records_for_principal(
        &self,
        principal: &Principal,
    ) -> AppResult<Vec<AccessRecord>>;

    /// Lists every record fanned out from one logical constraint.
    async fn list_access_records_for_constraint(
        &self,
        base_constraint_id: &str,
    ) -> AppResult<Vec<AccessRecord>>;
}

/// Repository port for user records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Writes a user under `key`, replacing any previous item with that key.
    async fn put_user(&self, key: &PhysicalKey, user: UserRecord) -> AppResult<()>;

    /// Finds a user by identifier.
    async fn find_user(&self, user_id: &str) -> AppResult<Option<UserRecord>>;
}

/// Repository port for user to role assignments.
#[async_trait]
pub trait UserRoleRepository: Send + Sync {
    /// Writes an assignment under `key`, replacing any previous item with that key.
    async fn put_user_role(
        &self,
        key: &PhysicalKey,
        assignment: UserRoleAssignment,
    ) -> AppResult<()>;

    /// Lists the role assignments of a user.
    async fn list_roles_for_user(&self, user_id: &str) -> AppResult<Vec<UserRoleAssignment>>;
}

/// Repository port for constraints kept in the one-item-per-constraint format.
#[async_trait]
pub trait LegacyConstraintRepository: Send + Sync {
    /// Lists every legacy constraint.
    async fn list_legacy_constraints(&self) -> AppResult<Vec<Constraint>>;
}
