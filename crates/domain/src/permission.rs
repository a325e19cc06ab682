use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vams_core::{AppError, AppResult, NonEmptyString};

use crate::access_record::ensure_record_id_part;

/// Request verbs a permission entry can grant or deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PermissionVerb {
    /// Read access.
    Get,
    /// Replace/update access.
    Put,
    /// Create access.
    Post,
    /// Delete access.
    Delete,
}

impl PermissionVerb {
    /// Returns a stable storage value for this verb.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }

    /// Returns all known verbs.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[PermissionVerb] = &[
            PermissionVerb::Get,
            PermissionVerb::Put,
            PermissionVerb::Post,
            PermissionVerb::Delete,
        ];

        ALL
    }
}

impl FromStr for PermissionVerb {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "GET" => Ok(Self::Get),
            "PUT" => Ok(Self::Put),
            "POST" => Ok(Self::Post),
            "DELETE" => Ok(Self::Delete),
            _ => Err(AppError::Validation(format!(
                "unknown permission value '{value}'"
            ))),
        }
    }
}

impl Display for PermissionVerb {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Effect of a permission entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    /// Grants the verb.
    Allow,
    /// Refuses the verb.
    Deny,
}

impl PermissionType {
    /// Returns a stable storage value for this effect.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

impl FromStr for PermissionType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            _ => Err(AppError::Validation(format!(
                "unknown permission type '{value}'"
            ))),
        }
    }
}

/// A group or a single user referenced by permission entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Principal {
    /// A role name used as a group principal.
    Group(String),
    /// A user identifier.
    User(String),
}

impl Principal {
    /// Returns the principal identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Group(id) | Self::User(id) => id.as_str(),
        }
    }

    /// Returns the principal kind used in record identifiers.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Group(_) => "group",
            Self::User(_) => "user",
        }
    }
}

impl Display for Principal {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}::{}", self.kind(), self.id())
    }
}

/// One allow/deny rule for a principal inside a constraint.
///
/// Whether `principal_id` names a group or a user is decided by the
/// constraint list the entry lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PermissionEntryFields")]
pub struct PermissionEntry {
    id: String,
    principal_id: NonEmptyString,
    permission: PermissionVerb,
    permission_type: PermissionType,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PermissionEntryFields {
    #[serde(default)]
    id: String,
    #[serde(alias = "groupId", alias = "userId")]
    principal_id: String,
    permission: PermissionVerb,
    permission_type: PermissionType,
}

impl TryFrom<PermissionEntryFields> for PermissionEntry {
    type Error = AppError;

    fn try_from(fields: PermissionEntryFields) -> Result<Self, Self::Error> {
        Self::new(
            fields.id,
            fields.principal_id,
            fields.permission,
            fields.permission_type,
        )
    }
}

impl PermissionEntry {
    /// Creates a validated permission entry.
    pub fn new(
        id: impl Into<String>,
        principal_id: impl Into<String>,
        permission: PermissionVerb,
        permission_type: PermissionType,
    ) -> AppResult<Self> {
        let principal_id = NonEmptyString::new(principal_id)?;
        ensure_record_id_part("principalId", principal_id.as_str())?;

        Ok(Self {
            id: id.into(),
            principal_id,
            permission,
            permission_type,
        })
    }

    /// Returns the entry identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the referenced principal identifier.
    #[must_use]
    pub fn principal_id(&self) -> &str {
        self.principal_id.as_str()
    }

    /// Returns the verb.
    #[must_use]
    pub fn permission(&self) -> PermissionVerb {
        self.permission
    }

    /// Returns the effect.
    #[must_use]
    pub fn permission_type(&self) -> PermissionType {
        self.permission_type
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{PermissionEntry, PermissionType, PermissionVerb, Principal};

    #[test]
    fn verb_roundtrip_storage_value() {
        for verb in PermissionVerb::all() {
            let restored = PermissionVerb::from_str(verb.as_str());
            assert!(restored.is_ok_and(|value| value == *verb));
        }
    }

    #[test]
    fn unknown_verb_is_rejected() {
        assert!(PermissionVerb::from_str("PATCH").is_err());
        assert!(PermissionType::from_str("maybe").is_err());
    }

    #[test]
    fn entry_accepts_legacy_group_id_field() {
        let entry = serde_json::from_str::<PermissionEntry>(
            r#"{"id":"p1","groupId":"admin","permission":"GET","permissionType":"allow"}"#,
        );
        assert!(entry.is_ok_and(|entry| entry.principal_id() == "admin"));
    }

    #[test]
    fn entry_rejects_blank_principal() {
        let entry = PermissionEntry::new("p1", " ", PermissionVerb::Get, PermissionType::Allow);
        assert!(entry.is_err());
    }

    #[test]
    fn entry_rejects_record_id_separator_in_principal() {
        let entry =
            PermissionEntry::new("p1", "y#group#z", PermissionVerb::Get, PermissionType::Allow);
        assert!(entry.is_err_and(|error| error.to_string().contains("y#group#z")));

        let parsed = serde_json::from_str::<PermissionEntry>(
            r#"{"id":"p1","userId":"a#b","permission":"GET","permissionType":"allow"}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn principal_formats_with_kind() {
        assert_eq!(Principal::Group("admin".to_owned()).to_string(), "group::admin");
        assert_eq!(Principal::User("u-1".to_owned()).to_string(), "user::u-1");
    }
}
