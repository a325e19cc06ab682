use vams_core::PhysicalKey;
use vams_domain::{AccessRecord, Role, UserRecord, UserRoleAssignment};

/// Names of the logical tables access-control records live in.
///
/// Table names feed into every [`PhysicalKey`], so two deployments using
/// different tables never share keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTables {
    /// Role records.
    pub roles: String,
    /// Denormalized constraint records.
    pub constraints: String,
    /// User records.
    pub users: String,
    /// User to role assignments.
    pub user_roles: String,
}

impl Default for AccessTables {
    fn default() -> Self {
        Self {
            roles: "vams-roles".to_owned(),
            constraints: "vams-constraints".to_owned(),
            users: "vams-users".to_owned(),
            user_roles: "vams-user-roles".to_owned(),
        }
    }
}

impl AccessTables {
    /// Returns the key of a role record.
    #[must_use]
    pub fn role_key(&self, role: &Role) -> PhysicalKey {
        PhysicalKey::derive(self.roles.as_str(), role.role_name())
    }

    /// Returns the key of a denormalized constraint record.
    #[must_use]
    pub fn access_record_key(&self, record: &AccessRecord) -> PhysicalKey {
        PhysicalKey::derive(self.constraints.as_str(), record.record_id())
    }

    /// Returns the key of a user record.
    #[must_use]
    pub fn user_key(&self, user: &UserRecord) -> PhysicalKey {
        PhysicalKey::derive(self.users.as_str(), user.user_id())
    }

    /// Returns the key of a user to role assignment.
    #[must_use]
    pub fn user_role_key(&self, assignment: &UserRoleAssignment) -> PhysicalKey {
        PhysicalKey::derive(self.user_roles.as_str(), assignment.slug().as_str())
    }
}
