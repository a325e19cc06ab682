use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

/// Attribute map of one stored item.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// One stored attribute carrying its primitive type tag.
///
/// Serializes to the tagged wire form, e.g. `{"S": "admin"}` or
/// `{"L": [{"S": "a"}]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String value.
    #[serde(rename = "S")]
    S(String),
    /// Number value kept in its decimal string form.
    #[serde(rename = "N")]
    N(String),
    /// Boolean value.
    #[serde(rename = "BOOL")]
    Bool(bool),
    /// Explicit null marker.
    #[serde(rename = "NULL")]
    Null(bool),
    /// Ordered list of values.
    #[serde(rename = "L")]
    L(Vec<AttributeValue>),
    /// Nested map of values.
    #[serde(rename = "M")]
    M(AttributeMap),
}

impl AttributeValue {
    /// Creates a string attribute.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::S(value.into())
    }

    /// Returns the string payload when tagged `S`.
    #[must_use]
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns the boolean payload when tagged `BOOL`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the list payload when tagged `L`.
    #[must_use]
    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::L(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    /// Returns the map payload when tagged `M`.
    #[must_use]
    pub fn as_map(&self) -> Option<&AttributeMap> {
        match self {
            Self::M(values) => Some(values),
            _ => None,
        }
    }

    /// Returns the short type tag name.
    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
            Self::L(_) => "L",
            Self::M(_) => "M",
        }
    }
}

/// Reads a required string attribute.
pub fn required_s<'a>(item: &'a AttributeMap, name: &str) -> AppResult<&'a str> {
    match item.get(name) {
        Some(AttributeValue::S(value)) => Ok(value.as_str()),
        Some(other) => Err(mistyped(name, "S", other)),
        None => Err(AppError::Validation(format!(
            "attribute '{name}' is required"
        ))),
    }
}

/// Reads an optional string attribute; `NULL` counts as absent.
pub fn optional_s<'a>(item: &'a AttributeMap, name: &str) -> AppResult<Option<&'a str>> {
    match item.get(name) {
        Some(AttributeValue::S(value)) => Ok(Some(value.as_str())),
        Some(AttributeValue::Null(_)) | None => Ok(None),
        Some(other) => Err(mistyped(name, "S", other)),
    }
}

/// Reads an optional boolean attribute.
pub fn optional_bool(item: &AttributeMap, name: &str) -> AppResult<Option<bool>> {
    match item.get(name) {
        Some(AttributeValue::Bool(value)) => Ok(Some(*value)),
        Some(AttributeValue::Null(_)) | None => Ok(None),
        Some(other) => Err(mistyped(name, "BOOL", other)),
    }
}

/// Reads an optional list attribute; absence yields an empty slice.
pub fn list_or_empty<'a>(item: &'a AttributeMap, name: &str) -> AppResult<&'a [AttributeValue]> {
    match item.get(name) {
        Some(AttributeValue::L(values)) => Ok(values.as_slice()),
        Some(AttributeValue::Null(_)) | None => Ok(&[]),
        Some(other) => Err(mistyped(name, "L", other)),
    }
}

fn mistyped(name: &str, expected: &str, actual: &AttributeValue) -> AppError {
    AppError::Validation(format!(
        "attribute '{name}' must be tagged '{expected}' but was '{}'",
        actual.type_tag()
    ))
}
