use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vams_core::{AppError, AppResult, NonEmptyString};

/// Origin of a role definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleSource {
    /// Seeded by the deployment itself.
    #[serde(rename = "INTERNAL_SYSTEM")]
    InternalSystem,
}

impl RoleSource {
    /// Returns a stable storage value for this source.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InternalSystem => "INTERNAL_SYSTEM",
        }
    }
}

impl FromStr for RoleSource {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "INTERNAL_SYSTEM" => Ok(Self::InternalSystem),
            _ => Err(AppError::Validation(format!(
                "unknown role source '{value}'"
            ))),
        }
    }
}

/// Named role; its name is the group principal in constraint group permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    role_name: NonEmptyString,
    description: String,
    source: Option<RoleSource>,
    mfa_required: bool,
    created_on: DateTime<Utc>,
}

impl Role {
    /// Creates a validated role.
    pub fn new(
        role_name: impl Into<String>,
        description: impl Into<String>,
        source: Option<RoleSource>,
        mfa_required: bool,
        created_on: DateTime<Utc>,
    ) -> AppResult<Self> {
        let role_name = NonEmptyString::new(role_name)
            .map_err(|_| AppError::Validation("roleName must not be empty".to_owned()))?;

        Ok(Self {
            role_name,
            description: description.into(),
            source,
            mfa_required,
            created_on,
        })
    }

    /// Returns the role name.
    #[must_use]
    pub fn role_name(&self) -> &str {
        self.role_name.as_str()
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the role source.
    #[must_use]
    pub fn source(&self) -> Option<RoleSource> {
        self.source
    }

    /// Returns whether sessions need MFA to use this role.
    #[must_use]
    pub fn mfa_required(&self) -> bool {
        self.mfa_required
    }

    /// Returns the creation time.
    #[must_use]
    pub fn created_on(&self) -> DateTime<Utc> {
        self.created_on
    }
}

/// Link between a user and one of their roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRoleAssignment {
    user_id: NonEmptyString,
    role_name: NonEmptyString,
    created_on: DateTime<Utc>,
}

impl UserRoleAssignment {
    /// Creates a validated assignment.
    pub fn new(
        user_id: impl Into<String>,
        role_name: impl Into<String>,
        created_on: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            user_id: NonEmptyString::new(user_id)?,
            role_name: NonEmptyString::new(role_name)?,
            created_on,
        })
    }

    /// Returns the user identifier.
    #[must_use]
    pub fn user_id(&self) -> &str {
        self.user_id.as_str()
    }

    /// Returns the role name.
    #[must_use]
    pub fn role_name(&self) -> &str {
        self.role_name.as_str()
    }

    /// Returns the creation time.
    #[must_use]
    pub fn created_on(&self) -> DateTime<Utc> {
        self.created_on
    }

    /// Returns the slug identifying this assignment in storage.
    #[must_use]
    pub fn slug(&self) -> String {
        format!("{}#{}", self.user_id, self.role_name)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;

    use super::{Role, RoleSource, UserRoleAssignment};

    #[test]
    fn role_rejects_blank_name() {
        let result = Role::new("  ", "desc", None, false, Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn role_source_roundtrip_storage_value() {
        let restored = RoleSource::from_str(RoleSource::InternalSystem.as_str());
        assert!(restored.is_ok_and(|value| value == RoleSource::InternalSystem));
        assert!(RoleSource::from_str("EXTERNAL").is_err());
    }

    #[test]
    fn assignment_slug_combines_user_and_role() {
        let assignment = UserRoleAssignment::new("u-1", "admin", Utc::now());
        assert!(assignment.is_ok_and(|assignment| assignment.slug() == "u-1#admin"));
    }
}
