use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use vams_core::{AppError, AppResult};
use vams_domain::{
    Constraint, ConstraintAudit, Criteria, CriteriaExpression, CriteriaOperator, ObjectType,
    PermissionEntry, PermissionType, PermissionVerb, Role, RoleSource,
};

const CONSTRAINT_ENTITY_TYPE: &str = "constraint";
const CONSTRAINT_SORT_KEY_PREFIX: &str = "constraint#";
const DEFAULT_CATALOG_JSON: &str = include_str!("default_catalog.json");

/// Actor stamped on records written by provisioning.
pub const PROVISIONING_ACTOR: &str = "SYSTEM";

/// Static role and constraint definitions seeded at deployment time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedCatalog {
    #[serde(default)]
    roles: Vec<RoleSeed>,
    #[serde(default)]
    constraints: Vec<ConstraintSeed>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleSeed {
    role_name: Option<String>,
    description: Option<String>,
    source: Option<String>,
    #[serde(default)]
    mfa_required: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConstraintSeed {
    entity_type: Option<String>,
    sk: Option<String>,
    constraint_id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    object_type: Option<String>,
    criteria_and: Option<Vec<CriteriaSeed>>,
    criteria_or: Option<Vec<CriteriaSeed>>,
    group_permissions: Option<Vec<PermissionSeed>>,
    user_permissions: Option<Vec<PermissionSeed>>,
}

#[derive(Debug, Clone, Deserialize)]
struct CriteriaSeed {
    id: Option<String>,
    field: Option<String>,
    operator: Option<String>,
    value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PermissionSeed {
    id: Option<String>,
    #[serde(alias = "groupId", alias = "userId")]
    principal_id: Option<String>,
    permission: Option<String>,
    permission_type: Option<String>,
}

/// Validated domain records of a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogDefinitions {
    /// Roles to seed.
    pub roles: Vec<Role>,
    /// Constraints to seed.
    pub constraints: Vec<Constraint>,
}

impl SeedCatalog {
    /// Returns the catalog built into the provisioner.
    pub fn default_catalog() -> AppResult<Self> {
        Self::from_json(DEFAULT_CATALOG_JSON)
    }

    /// Parses a catalog document.
    pub fn from_json(document: &str) -> AppResult<Self> {
        serde_json::from_str(document)
            .map_err(|error| AppError::Validation(format!("invalid seed catalog: {error}")))
    }

    /// Returns the number of role definitions.
    #[must_use]
    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    /// Returns the number of constraint definitions.
    #[must_use]
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Validates every definition, failing on the first malformed one.
    pub fn to_definitions(&self, now: DateTime<Utc>) -> AppResult<CatalogDefinitions> {
        let roles = self
            .roles
            .iter()
            .enumerate()
            .map(|(index, seed)| seed.to_role(index, now))
            .collect::<AppResult<Vec<_>>>()?;

        let constraints = self
            .constraints
            .iter()
            .enumerate()
            .map(|(index, seed)| seed.to_constraint(index, now))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(CatalogDefinitions { roles, constraints })
    }
}

impl RoleSeed {
    fn to_role(&self, index: usize, now: DateTime<Utc>) -> AppResult<Role> {
        let role_name = self
            .role_name
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| {
                AppError::Validation(format!("role #{index} is missing required field 'roleName'"))
            })?;

        let context = |error: AppError| {
            AppError::Validation(format!("role '{role_name}' is invalid: {error}"))
        };

        let description = self.description.as_deref().ok_or_else(|| {
            AppError::Validation(format!(
                "role '{role_name}' is missing required field 'description'"
            ))
        })?;
        let source = self
            .source
            .as_deref()
            .map(RoleSource::from_str)
            .transpose()
            .map_err(context)?;

        Role::new(role_name, description, source, self.mfa_required, now).map_err(context)
    }
}

impl ConstraintSeed {
    fn to_constraint(&self, index: usize, now: DateTime<Utc>) -> AppResult<Constraint> {
        let constraint_id = self.resolve_constraint_id(index)?;
        let missing = |field: &str| {
            AppError::Validation(format!(
                "constraint '{constraint_id}' is missing required field '{field}'"
            ))
        };
        let context = |error: AppError| {
            AppError::Validation(format!("constraint '{constraint_id}' is invalid: {error}"))
        };

        if let Some(entity_type) = self.entity_type.as_deref()
            && entity_type != CONSTRAINT_ENTITY_TYPE
        {
            return Err(AppError::Validation(format!(
                "constraint '{constraint_id}' has entityType '{entity_type}', expected '{CONSTRAINT_ENTITY_TYPE}'"
            )));
        }

        let name = self.name.as_deref().ok_or_else(|| missing("name"))?;
        let description = self
            .description
            .as_deref()
            .ok_or_else(|| missing("description"))?;
        let object_type = self
            .object_type
            .as_deref()
            .ok_or_else(|| missing("objectType"))
            .and_then(|value| ObjectType::from_str(value).map_err(context))?;

        let criteria = Criteria::from_lists(
            criteria_expressions(constraint_id, self.criteria_and.as_deref())?,
            criteria_expressions(constraint_id, self.criteria_or.as_deref())?,
        )
        .map_err(context)?;

        let group_permissions =
            permission_entries(constraint_id, "group", self.group_permissions.as_deref())?;
        let user_permissions =
            permission_entries(constraint_id, "user", self.user_permissions.as_deref())?;

        let audit = ConstraintAudit {
            date_created: now,
            date_modified: now,
            created_by: PROVISIONING_ACTOR.to_owned(),
            modified_by: PROVISIONING_ACTOR.to_owned(),
        };

        Constraint::new(
            constraint_id,
            name,
            description,
            object_type,
            criteria,
            group_permissions,
            user_permissions,
            audit,
        )
        .map_err(context)
    }

    fn resolve_constraint_id(&self, index: usize) -> AppResult<&str> {
        let from_sort_key = self
            .sk
            .as_deref()
            .map(|sk| {
                sk.strip_prefix(CONSTRAINT_SORT_KEY_PREFIX).ok_or_else(|| {
                    AppError::Validation(format!(
                        "constraint #{index} has sk '{sk}' without the '{CONSTRAINT_SORT_KEY_PREFIX}' prefix"
                    ))
                })
            })
            .transpose()?;

        match (self.constraint_id.as_deref(), from_sort_key) {
            (Some(id), Some(sk_id)) if id != sk_id => Err(AppError::Validation(format!(
                "constraint '{id}' does not match its sk '{CONSTRAINT_SORT_KEY_PREFIX}{sk_id}'"
            ))),
            (Some(id), _) | (None, Some(id)) if !id.trim().is_empty() => Ok(id),
            _ => Err(AppError::Validation(format!(
                "constraint #{index} is missing required field 'constraintId'"
            ))),
        }
    }
}

fn criteria_expressions(
    constraint_id: &str,
    seeds: Option<&[CriteriaSeed]>,
) -> AppResult<Vec<CriteriaExpression>> {
    seeds
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(index, seed)| {
            let missing = |field: &str| {
                AppError::Validation(format!(
                    "constraint '{constraint_id}' criteria #{index} is missing required field '{field}'"
                ))
            };
            let field = seed.field.as_deref().ok_or_else(|| missing("field"))?;
            let operator = seed.operator.as_deref().ok_or_else(|| missing("operator"))?;
            let value = seed.value.as_deref().ok_or_else(|| missing("value"))?;
            let id = seed
                .id
                .clone()
                .unwrap_or_else(|| format!("{constraint_id}-criteria-{index}"));

            CriteriaOperator::from_str(operator)
                .and_then(|operator| CriteriaExpression::new(id, field, operator, value))
                .map_err(|error| {
                    AppError::Validation(format!(
                        "constraint '{constraint_id}' criteria #{index} is invalid: {error}"
                    ))
                })
        })
        .collect()
}

fn permission_entries(
    constraint_id: &str,
    kind: &str,
    seeds: Option<&[PermissionSeed]>,
) -> AppResult<Vec<PermissionEntry>> {
    seeds
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(index, seed)| {
            let missing = |field: &str| {
                AppError::Validation(format!(
                    "constraint '{constraint_id}' {kind} permission #{index} is missing required field '{field}'"
                ))
            };
            let principal_id = seed
                .principal_id
                .as_deref()
                .ok_or_else(|| missing("principalId"))?;
            let permission = seed
                .permission
                .as_deref()
                .ok_or_else(|| missing("permission"))?;
            let permission_type = seed
                .permission_type
                .as_deref()
                .ok_or_else(|| missing("permissionType"))?;
            let id = seed
                .id
                .clone()
                .unwrap_or_else(|| format!("{constraint_id}-{kind}-{index}"));

            PermissionVerb::from_str(permission)
                .and_then(|verb| {
                    PermissionEntry::new(
                        id,
                        principal_id,
                        verb,
                        PermissionType::from_str(permission_type)?,
                    )
                })
                .map_err(|error| {
                    AppError::Validation(format!(
                        "constraint '{constraint_id}' {kind} permission #{index} is invalid: {error}"
                    ))
                })
        })
        .collect()
}
