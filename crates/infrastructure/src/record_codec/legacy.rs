use chrono::{DateTime, Utc};
use vams_core::{
    AppError, AppResult, AttributeMap, AttributeValue, list_or_empty, optional_s, required_s,
};
use vams_domain::{
    Constraint, ConstraintAudit, Criteria, CriteriaExpression, PermissionEntry,
};

use super::{GROUP_ID, USER_ID, decode_audit, put_audit, put_s};

const ENTITY_TYPE: &str = "constraint";
const SORT_KEY_PREFIX: &str = "constraint#";
const LEGACY_ACTOR: &str = "legacy";

/// Encodes a constraint in the one-item-per-constraint format.
#[must_use]
pub fn encode_legacy_constraint(constraint: &Constraint) -> AttributeMap {
    let mut item = AttributeMap::new();
    put_s(&mut item, "entityType", ENTITY_TYPE);
    put_s(
        &mut item,
        "sk",
        format!("{SORT_KEY_PREFIX}{}", constraint.constraint_id()).as_str(),
    );
    put_s(&mut item, "constraintId", constraint.constraint_id());
    put_s(&mut item, "name", constraint.name());
    put_s(&mut item, "description", constraint.description());
    put_s(&mut item, "objectType", constraint.object_type().as_str());

    let (name, expressions) = match constraint.criteria() {
        Criteria::And(expressions) => ("criteriaAnd", expressions),
        Criteria::Or(expressions) => ("criteriaOr", expressions),
    };
    item.insert(
        name.to_owned(),
        AttributeValue::L(expressions.iter().map(encode_expression).collect()),
    );
    item.insert(
        "groupPermissions".to_owned(),
        AttributeValue::L(
            constraint
                .group_permissions()
                .iter()
                .map(|entry| encode_entry(GROUP_ID, entry))
                .collect(),
        ),
    );
    item.insert(
        "userPermissions".to_owned(),
        AttributeValue::L(
            constraint
                .user_permissions()
                .iter()
                .map(|entry| encode_entry(USER_ID, entry))
                .collect(),
        ),
    );
    put_audit(&mut item, constraint.audit());
    item
}

/// Decodes a constraint stored in the one-item-per-constraint format.
///
/// Items written before provenance was tracked get `fallback_time` and a
/// `legacy` actor.
pub fn decode_legacy_constraint(
    item: &AttributeMap,
    fallback_time: DateTime<Utc>,
) -> AppResult<Constraint> {
    let decode = || -> AppResult<Constraint> {
        if let Some(entity_type) = optional_s(item, "entityType")?
            && entity_type != ENTITY_TYPE
        {
            return Err(AppError::Validation(format!(
                "entityType '{entity_type}' is not '{ENTITY_TYPE}'"
            )));
        }

        let constraint_id = match optional_s(item, "constraintId")? {
            Some(constraint_id) => constraint_id,
            None => required_s(item, "sk")?
                .strip_prefix(SORT_KEY_PREFIX)
                .ok_or_else(|| {
                    AppError::Validation(format!("sk must start with '{SORT_KEY_PREFIX}'"))
                })?,
        };

        let criteria = Criteria::from_lists(
            decode_expressions(item, "criteriaAnd")?,
            decode_expressions(item, "criteriaOr")?,
        )
        .map_err(|error| with_id(constraint_id, error))?;

        let audit = if item.contains_key("dateCreated") {
            decode_audit(item)?
        } else {
            ConstraintAudit {
                date_created: fallback_time,
                date_modified: fallback_time,
                created_by: LEGACY_ACTOR.to_owned(),
                modified_by: LEGACY_ACTOR.to_owned(),
            }
        };

        Constraint::new(
            constraint_id,
            optional_s(item, "name")?.unwrap_or_default(),
            optional_s(item, "description")?.unwrap_or_default(),
            required_s(item, "objectType")?.parse()?,
            criteria,
            decode_entries(item, "groupPermissions", GROUP_ID)
                .map_err(|error| with_id(constraint_id, error))?,
            decode_entries(item, "userPermissions", USER_ID)
                .map_err(|error| with_id(constraint_id, error))?,
            audit,
        )
    };

    decode().map_err(|error| {
        AppError::Internal(format!("failed to decode legacy constraint item: {error}"))
    })
}

fn with_id(constraint_id: &str, error: AppError) -> AppError {
    AppError::Validation(format!("constraint '{constraint_id}': {error}"))
}

fn encode_expression(expression: &CriteriaExpression) -> AttributeValue {
    let mut map = AttributeMap::new();
    put_s(&mut map, "id", expression.id());
    put_s(&mut map, "field", expression.field());
    put_s(&mut map, "operator", expression.operator().as_str());
    put_s(&mut map, "value", expression.value());
    AttributeValue::M(map)
}

fn encode_entry(principal_attribute: &str, entry: &PermissionEntry) -> AttributeValue {
    let mut map = AttributeMap::new();
    put_s(&mut map, "id", entry.id());
    put_s(&mut map, principal_attribute, entry.principal_id());
    put_s(&mut map, "permission", entry.permission().as_str());
    put_s(&mut map, "permissionType", entry.permission_type().as_str());
    AttributeValue::M(map)
}

fn decode_expressions(item: &AttributeMap, name: &str) -> AppResult<Vec<CriteriaExpression>> {
    list_or_empty(item, name)?
        .iter()
        .map(|value| {
            let map = as_map(name, value)?;
            CriteriaExpression::new(
                optional_s(map, "id")?.unwrap_or_default(),
                required_s(map, "field")?,
                required_s(map, "operator")?.parse()?,
                required_s(map, "value")?,
            )
        })
        .collect()
}

fn decode_entries(
    item: &AttributeMap,
    name: &str,
    principal_attribute: &str,
) -> AppResult<Vec<PermissionEntry>> {
    list_or_empty(item, name)?
        .iter()
        .map(|value| {
            let map = as_map(name, value)?;
            PermissionEntry::new(
                optional_s(map, "id")?.unwrap_or_default(),
                required_s(map, principal_attribute)?,
                required_s(map, "permission")?.parse()?,
                required_s(map, "permissionType")?.parse()?,
            )
        })
        .collect()
}

fn as_map<'a>(name: &str, value: &'a AttributeValue) -> AppResult<&'a AttributeMap> {
    value.as_map().ok_or_else(|| {
        AppError::Validation(format!(
            "entries of '{name}' must be tagged 'M' but one was '{}'",
            value.type_tag()
        ))
    })
}
