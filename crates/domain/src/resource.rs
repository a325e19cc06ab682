use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ObjectType;

/// Attribute carrying the object type of an evaluated resource.
pub const OBJECT_TYPE_FIELD: &str = "object__type";

/// Attribute carrying the request path of `api` and `web` resources.
pub const ROUTE_PATH_FIELD: &str = "route__path";

/// One runtime value of a resource attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceValue {
    /// Scalar text value.
    Text(String),
    /// List of text values, e.g. asset tags.
    List(Vec<String>),
}

/// Attribute bag of the resource a request targets.
///
/// Fields absent from the bag evaluate as empty text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAttributes {
    values: BTreeMap<String, ResourceValue>,
}

impl ResourceAttributes {
    /// Creates an empty attribute bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bag for an object of the given type.
    #[must_use]
    pub fn for_object(object_type: ObjectType) -> Self {
        Self::new().with_text(OBJECT_TYPE_FIELD, object_type.as_str())
    }

    /// Creates an `api` resource for a request path.
    #[must_use]
    pub fn api_route(path: impl Into<String>) -> Self {
        Self::for_object(ObjectType::Api).with_text(ROUTE_PATH_FIELD, path)
    }

    /// Creates a `web` resource for a page path.
    #[must_use]
    pub fn web_route(path: impl Into<String>) -> Self {
        Self::for_object(ObjectType::Web).with_text(ROUTE_PATH_FIELD, path)
    }

    /// Sets a text attribute.
    #[must_use]
    pub fn with_text(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.values
            .insert(field.into(), ResourceValue::Text(value.into()));
        self
    }

    /// Sets a list attribute.
    #[must_use]
    pub fn with_list<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values.insert(
            field.into(),
            ResourceValue::List(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Returns a raw attribute value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&ResourceValue> {
        self.values.get(field)
    }

    /// Returns the attribute as text; lists are joined with commas.
    #[must_use]
    pub fn text(&self, field: &str) -> String {
        match self.values.get(field) {
            Some(ResourceValue::Text(value)) => value.clone(),
            Some(ResourceValue::List(values)) => values.join(","),
            None => String::new(),
        }
    }

    /// Returns the attribute as a list; text becomes a one-element list.
    #[must_use]
    pub fn list(&self, field: &str) -> Vec<&str> {
        match self.values.get(field) {
            Some(ResourceValue::Text(value)) => vec![value.as_str()],
            Some(ResourceValue::List(values)) => values.iter().map(String::as_str).collect(),
            None => Vec::new(),
        }
    }

    /// Returns the declared object type value.
    #[must_use]
    pub fn object_type(&self) -> String {
        self.text(OBJECT_TYPE_FIELD)
    }
}

#[cfg(test)]
mod tests {
    use super::{ROUTE_PATH_FIELD, ResourceAttributes};

    #[test]
    fn missing_field_reads_as_empty() {
        let resource = ResourceAttributes::new();
        assert_eq!(resource.text("databaseId"), "");
        assert!(resource.list("tags").is_empty());
    }

    #[test]
    fn api_route_sets_type_and_path() {
        let resource = ResourceAttributes::api_route("/assets");
        assert_eq!(resource.object_type(), "api");
        assert_eq!(resource.text(ROUTE_PATH_FIELD), "/assets");
    }

    #[test]
    fn text_field_reads_as_single_item_list() {
        let resource = ResourceAttributes::new().with_text("assetType", ".glb");
        assert_eq!(resource.list("assetType"), vec![".glb"]);
    }
}
