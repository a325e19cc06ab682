//! Conversion between domain records and stored attribute maps.
//!
//! Access records keep their criteria and permission lists as JSON strings so
//! a single item carries the whole constraint, and expose `groupId` or
//! `userId` as plain attributes for the principal index.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use vams_core::{
    AppError, AppResult, AttributeMap, AttributeValue, optional_bool, optional_s, required_s,
};
use vams_domain::{
    AccessRecord, Constraint, ConstraintAudit, Criteria, CriteriaExpression, PermissionEntry,
    Principal, Role, RoleSource, UserRecord, UserRoleAssignment, record_id,
};

mod legacy;

pub use legacy::{decode_legacy_constraint, encode_legacy_constraint};

pub(crate) const GROUP_ID: &str = "groupId";
pub(crate) const USER_ID: &str = "userId";
const CONSTRAINT_ID: &str = "constraintId";
const CRITERIA_AND: &str = "criteriaAnd";
const CRITERIA_OR: &str = "criteriaOr";
const GROUP_PERMISSIONS: &str = "groupPermissions";
const USER_PERMISSIONS: &str = "userPermissions";

/// Encodes a role item.
#[must_use]
pub fn encode_role(role: &Role) -> AttributeMap {
    let mut item = AttributeMap::new();
    put_s(&mut item, "roleName", role.role_name());
    put_s(&mut item, "description", role.description());
    if let Some(source) = role.source() {
        put_s(&mut item, "source", source.as_str());
    }
    item.insert(
        "mfaRequired".to_owned(),
        AttributeValue::Bool(role.mfa_required()),
    );
    put_s(&mut item, "createdOn", role.created_on().to_rfc3339().as_str());
    item
}

/// Decodes a role item.
pub fn decode_role(item: &AttributeMap) -> AppResult<Role> {
    let decode = || -> AppResult<Role> {
        let source = optional_s(item, "source")?
            .map(str::parse::<RoleSource>)
            .transpose()?;
        Role::new(
            required_s(item, "roleName")?,
            optional_s(item, "description")?.unwrap_or_default(),
            source,
            optional_bool(item, "mfaRequired")?.unwrap_or(false),
            timestamp(item, "createdOn")?,
        )
    };

    decode().map_err(|error| AppError::Internal(format!("failed to decode role item: {error}")))
}

/// Encodes a user item.
#[must_use]
pub fn encode_user(user: &UserRecord) -> AttributeMap {
    let mut item = AttributeMap::new();
    put_s(&mut item, USER_ID, user.user_id());
    put_s(&mut item, "email", user.email().as_str());
    put_s(&mut item, "createdOn", user.created_on().to_rfc3339().as_str());
    item
}

/// Decodes a user item.
pub fn decode_user(item: &AttributeMap) -> AppResult<UserRecord> {
    let decode = || -> AppResult<UserRecord> {
        UserRecord::new(
            required_s(item, USER_ID)?,
            required_s(item, "email")?,
            timestamp(item, "createdOn")?,
        )
    };

    decode().map_err(|error| AppError::Internal(format!("failed to decode user item: {error}")))
}

/// Encodes a user to role assignment item.
#[must_use]
pub fn encode_user_role(assignment: &UserRoleAssignment) -> AttributeMap {
    let mut item = AttributeMap::new();
    put_s(&mut item, USER_ID, assignment.user_id());
    put_s(&mut item, "roleName", assignment.role_name());
    put_s(
        &mut item,
        "createdOn",
        assignment.created_on().to_rfc3339().as_str(),
    );
    item
}

/// Decodes a user to role assignment item.
pub fn decode_user_role(item: &AttributeMap) -> AppResult<UserRoleAssignment> {
    let decode = || -> AppResult<UserRoleAssignment> {
        UserRoleAssignment::new(
            required_s(item, USER_ID)?,
            required_s(item, "roleName")?,
            timestamp(item, "createdOn")?,
        )
    };

    decode().map_err(|error| {
        AppError::Internal(format!("failed to decode user role item: {error}"))
    })
}

/// Encodes a denormalized access record item.
pub fn encode_access_record(record: &AccessRecord) -> AppResult<AttributeMap> {
    let constraint = record.constraint();
    let (criteria_and, criteria_or) = constraint.criteria().as_lists();

    let mut item = AttributeMap::new();
    put_s(&mut item, CONSTRAINT_ID, record.record_id());
    put_s(&mut item, "name", constraint.name());
    put_s(&mut item, "description", constraint.description());
    put_s(&mut item, "objectType", constraint.object_type().as_str());
    put_s(&mut item, CRITERIA_AND, json_list(CRITERIA_AND, criteria_and)?.as_str());
    put_s(&mut item, CRITERIA_OR, json_list(CRITERIA_OR, criteria_or)?.as_str());
    put_s(
        &mut item,
        GROUP_PERMISSIONS,
        json_list(GROUP_PERMISSIONS, constraint.group_permissions())?.as_str(),
    );
    put_s(
        &mut item,
        USER_PERMISSIONS,
        json_list(USER_PERMISSIONS, constraint.user_permissions())?.as_str(),
    );
    put_audit(&mut item, constraint.audit());

    match record.principal() {
        Some(Principal::Group(group_id)) => put_s(&mut item, GROUP_ID, group_id),
        Some(Principal::User(user_id)) => put_s(&mut item, USER_ID, user_id),
        None => {}
    }

    Ok(item)
}

/// Decodes a denormalized access record item.
pub fn decode_access_record(item: &AttributeMap) -> AppResult<AccessRecord> {
    let decode = || -> AppResult<AccessRecord> {
        let stored_id = required_s(item, CONSTRAINT_ID)?;
        let principal = match (optional_s(item, GROUP_ID)?, optional_s(item, USER_ID)?) {
            (Some(group_id), None) => Some(Principal::Group(group_id.to_owned())),
            (None, Some(user_id)) => Some(Principal::User(user_id.to_owned())),
            (None, None) => None,
            (Some(_), Some(_)) => {
                return Err(AppError::Validation(format!(
                    "record '{stored_id}' names both a group and a user"
                )));
            }
        };
        let base_id = match principal.as_ref() {
            Some(principal) => stored_id
                .strip_suffix(record_id("", Some(principal)).as_str())
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "record '{stored_id}' does not end with its principal '{principal}'"
                    ))
                })?,
            None => stored_id,
        };

        let criteria = Criteria::from_lists(
            parse_json_list::<CriteriaExpression>(item, CRITERIA_AND)?,
            parse_json_list::<CriteriaExpression>(item, CRITERIA_OR)?,
        )?;
        let constraint = Constraint::new(
            base_id,
            optional_s(item, "name")?.unwrap_or_default(),
            optional_s(item, "description")?.unwrap_or_default(),
            required_s(item, "objectType")?.parse()?,
            criteria,
            parse_json_list::<PermissionEntry>(item, GROUP_PERMISSIONS)?,
            parse_json_list::<PermissionEntry>(item, USER_PERMISSIONS)?,
            decode_audit(item)?,
        )?;

        Ok(match principal {
            Some(principal) => AccessRecord::for_principal(constraint, principal),
            None => AccessRecord::fallback(constraint),
        })
    };

    decode().map_err(|error| {
        AppError::Internal(format!("failed to decode constraint item: {error}"))
    })
}

pub(crate) fn put_s(item: &mut AttributeMap, name: &str, value: &str) {
    item.insert(name.to_owned(), AttributeValue::string(value));
}

pub(crate) fn put_audit(item: &mut AttributeMap, audit: &ConstraintAudit) {
    put_s(item, "dateCreated", audit.date_created.to_rfc3339().as_str());
    put_s(item, "dateModified", audit.date_modified.to_rfc3339().as_str());
    put_s(item, "createdBy", audit.created_by.as_str());
    put_s(item, "modifiedBy", audit.modified_by.as_str());
}

pub(crate) fn decode_audit(item: &AttributeMap) -> AppResult<ConstraintAudit> {
    Ok(ConstraintAudit {
        date_created: timestamp(item, "dateCreated")?,
        date_modified: timestamp(item, "dateModified")?,
        created_by: required_s(item, "createdBy")?.to_owned(),
        modified_by: required_s(item, "modifiedBy")?.to_owned(),
    })
}

pub(crate) fn timestamp(item: &AttributeMap, name: &str) -> AppResult<DateTime<Utc>> {
    let value = required_s(item, name)?;
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| {
            AppError::Validation(format!("attribute '{name}' is not an RFC 3339 time: {error}"))
        })
}

fn json_list<T: Serialize>(name: &str, values: &[T]) -> AppResult<String> {
    serde_json::to_string(values)
        .map_err(|error| AppError::Internal(format!("failed to encode {name}: {error}")))
}

fn parse_json_list<T: DeserializeOwned>(item: &AttributeMap, name: &str) -> AppResult<Vec<T>> {
    match optional_s(item, name)? {
        Some(document) if !document.trim().is_empty() => serde_json::from_str(document)
            .map_err(|error| AppError::Validation(format!("attribute '{name}' is invalid: {error}"))),
        _ => Ok(Vec::new()),
    }
}
