use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vams_core::{AppError, AppResult, NonEmptyString};

use crate::access_record::ensure_record_id_part;
use crate::{Criteria, PermissionEntry, Principal, ResourceAttributes};

/// Resource category a constraint governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectType {
    /// Web application pages.
    Web,
    /// REST API routes.
    Api,
    /// Databases.
    Database,
    /// Assets.
    Asset,
    /// Processing pipelines.
    Pipeline,
    /// Workflows.
    Workflow,
    /// Metadata schemas.
    MetadataSchema,
    /// Tags.
    Tag,
    /// Tag types.
    TagType,
    /// Roles.
    Role,
    /// User to role assignments.
    UserRole,
}

impl ObjectType {
    /// Returns a stable storage value for this object type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Api => "api",
            Self::Database => "database",
            Self::Asset => "asset",
            Self::Pipeline => "pipeline",
            Self::Workflow => "workflow",
            Self::MetadataSchema => "metadataSchema",
            Self::Tag => "tag",
            Self::TagType => "tagType",
            Self::Role => "role",
            Self::UserRole => "userRole",
        }
    }
}

impl FromStr for ObjectType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "web" => Ok(Self::Web),
            "api" => Ok(Self::Api),
            "database" => Ok(Self::Database),
            "asset" => Ok(Self::Asset),
            "pipeline" => Ok(Self::Pipeline),
            "workflow" => Ok(Self::Workflow),
            "metadataSchema" => Ok(Self::MetadataSchema),
            "tag" => Ok(Self::Tag),
            "tagType" => Ok(Self::TagType),
            "role" => Ok(Self::Role),
            "userRole" => Ok(Self::UserRole),
            _ => Err(AppError::Validation(format!(
                "unknown object type '{value}'"
            ))),
        }
    }
}

/// Provenance fields stamped on stored constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintAudit {
    /// Creation time.
    pub date_created: DateTime<Utc>,
    /// Last modification time.
    pub date_modified: DateTime<Utc>,
    /// Creating actor.
    pub created_by: String,
    /// Last modifying actor.
    pub modified_by: String,
}

impl ConstraintAudit {
    /// Creates provenance for a record written now by `actor`.
    #[must_use]
    pub fn created_now(actor: impl Into<String>) -> Self {
        let now = Utc::now();
        let actor = actor.into();
        Self {
            date_created: now,
            date_modified: now,
            created_by: actor.clone(),
            modified_by: actor,
        }
    }
}

/// Match criteria plus the permissions granted or refused when they match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    constraint_id: NonEmptyString,
    name: String,
    description: String,
    object_type: ObjectType,
    #[serde(flatten)]
    criteria: Criteria,
    group_permissions: Vec<PermissionEntry>,
    user_permissions: Vec<PermissionEntry>,
    #[serde(flatten)]
    audit: ConstraintAudit,
}

impl Constraint {
    /// Creates a validated constraint.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        constraint_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        object_type: ObjectType,
        criteria: Criteria,
        group_permissions: Vec<PermissionEntry>,
        user_permissions: Vec<PermissionEntry>,
        audit: ConstraintAudit,
    ) -> AppResult<Self> {
        let constraint_id = NonEmptyString::new(constraint_id).map_err(|_| {
            AppError::Validation("constraintId must not be empty".to_owned())
        })?;
        ensure_record_id_part("constraintId", constraint_id.as_str())?;

        if criteria.expressions().is_empty() {
            return Err(AppError::Validation(format!(
                "constraint '{constraint_id}' must include at least one criteria expression"
            )));
        }

        Ok(Self {
            constraint_id,
            name: name.into(),
            description: description.into(),
            object_type,
            criteria,
            group_permissions,
            user_permissions,
            audit,
        })
    }

    /// Returns the constraint identifier.
    #[must_use]
    pub fn constraint_id(&self) -> &str {
        self.constraint_id.as_str()
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the governed object type.
    #[must_use]
    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    /// Returns the criteria.
    #[must_use]
    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    /// Returns the group permission entries.
    #[must_use]
    pub fn group_permissions(&self) -> &[PermissionEntry] {
        self.group_permissions.as_slice()
    }

    /// Returns the user permission entries.
    #[must_use]
    pub fn user_permissions(&self) -> &[PermissionEntry] {
        self.user_permissions.as_slice()
    }

    /// Returns provenance fields.
    #[must_use]
    pub fn audit(&self) -> &ConstraintAudit {
        &self.audit
    }

    /// Returns every entry paired with its typed principal, groups first.
    pub fn entries(&self) -> impl Iterator<Item = (Principal, &PermissionEntry)> {
        let groups = self
            .group_permissions
            .iter()
            .map(|entry| (Principal::Group(entry.principal_id().to_owned()), entry));
        let users = self
            .user_permissions
            .iter()
            .map(|entry| (Principal::User(entry.principal_id().to_owned()), entry));

        groups.chain(users)
    }

    /// Returns whether the constraint carries any permission entry.
    #[must_use]
    pub fn has_permissions(&self) -> bool {
        !self.group_permissions.is_empty() || !self.user_permissions.is_empty()
    }

    /// Returns whether the resource has this object type and satisfies the criteria.
    #[must_use]
    pub fn matches(&self, resource: &ResourceAttributes) -> bool {
        resource.object_type() == self.object_type.as_str() && self.criteria.evaluate(resource)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{Constraint, ConstraintAudit, ObjectType};
    use crate::{
        Criteria, CriteriaExpression, CriteriaOperator, PermissionEntry, PermissionType,
        PermissionVerb, Principal, ResourceAttributes,
    };

    fn web_constraint() -> Constraint {
        let criteria = Criteria::And(vec![
            CriteriaExpression::new("c1", "route__path", CriteriaOperator::Contains, ".*")
                .unwrap_or_else(|error| panic!("{error}")),
        ]);
        let group = PermissionEntry::new("p1", "admin", PermissionVerb::Get, PermissionType::Allow)
            .unwrap_or_else(|error| panic!("{error}"));
        let user = PermissionEntry::new("p2", "u-1", PermissionVerb::Get, PermissionType::Deny)
            .unwrap_or_else(|error| panic!("{error}"));

        Constraint::new(
            "web-all",
            "web all",
            "all web paths",
            ObjectType::Web,
            criteria,
            vec![group],
            vec![user],
            ConstraintAudit::created_now("test"),
        )
        .unwrap_or_else(|error| panic!("{error}"))
    }

    #[test]
    fn object_type_roundtrip_storage_value() {
        let restored = ObjectType::from_str(ObjectType::MetadataSchema.as_str());
        assert!(restored.is_ok_and(|value| value == ObjectType::MetadataSchema));
        assert!(ObjectType::from_str("bucket").is_err());
    }

    #[test]
    fn matches_requires_object_type() {
        let constraint = web_constraint();
        assert!(constraint.matches(&ResourceAttributes::web_route("/assets")));
        assert!(!constraint.matches(&ResourceAttributes::api_route("/assets")));
    }

    #[test]
    fn entries_type_principals_by_list() {
        let constraint = web_constraint();
        let principals: Vec<Principal> =
            constraint.entries().map(|(principal, _)| principal).collect();
        assert_eq!(
            principals,
            vec![
                Principal::Group("admin".to_owned()),
                Principal::User("u-1".to_owned())
            ]
        );
    }

    #[test]
    fn serializes_criteria_under_mode_key() {
        let encoded = serde_json::to_value(web_constraint()).unwrap_or_default();
        assert!(encoded.get("criteriaAnd").is_some());
        assert!(encoded.get("criteriaOr").is_none());
        assert_eq!(encoded.get("objectType"), Some(&serde_json::json!("web")));
    }

    #[test]
    fn constraint_id_with_record_id_separator_is_rejected() {
        let constraint = web_constraint();
        let result = Constraint::new(
            "x#group#y",
            "n",
            "d",
            ObjectType::Web,
            constraint.criteria().clone(),
            Vec::new(),
            Vec::new(),
            ConstraintAudit::created_now("test"),
        );
        assert!(result.is_err_and(|error| error.to_string().contains("x#group#y")));
    }

    #[test]
    fn blank_constraint_id_is_rejected() {
        let constraint = web_constraint();
        let result = Constraint::new(
            " ",
            "n",
            "d",
            ObjectType::Web,
            constraint.criteria().clone(),
            Vec::new(),
            Vec::new(),
            ConstraintAudit::created_now("test"),
        );
        assert!(result.is_err());
    }
}
