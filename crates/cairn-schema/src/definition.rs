use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use cairn_store::{Content, SCHEMA_KEY};
use cairn_types::{ObjectId, ObjectKind, SchemaName};

use crate::error::{SchemaError, SchemaResult};
use crate::shape::Shape;
use crate::validate::{validate, ValidationMode};
use crate::visit::{collect_refs, resolve_refs};

/// A schema: what kind of object it describes and the shape its content
/// (maps) or items (lists, logs) must satisfy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub name: SchemaName,
    #[serde(default = "default_kind")]
    pub kind: ObjectKind,
    /// Whether instances are kept in a per-schema index.
    #[serde(default)]
    pub indexing: bool,
    #[serde(default)]
    pub shape: Shape,
}

fn default_kind() -> ObjectKind {
    ObjectKind::Map
}

impl SchemaDefinition {
    pub fn new(name: SchemaName, kind: ObjectKind, shape: Shape) -> Self {
        Self {
            name,
            kind,
            indexing: false,
            shape,
        }
    }

    pub fn with_indexing(mut self, indexing: bool) -> Self {
        self.indexing = indexing;
        self
    }

    /// Parse a schema from its JSON form. Unknown keys (including a stored
    /// `$schema` back-reference) are ignored.
    pub fn from_json(value: &Value) -> SchemaResult<Self> {
        if !value.is_object() {
            return Err(SchemaError::InvalidDefinition(format!(
                "expected an object, got {value}"
            )));
        }
        if value.get("name").and_then(Value::as_str).is_none() {
            return Err(SchemaError::InvalidDefinition(
                "missing string field \"name\"".into(),
            ));
        }
        serde_json::from_value(value.clone())
            .map_err(|e| SchemaError::InvalidDefinition(e.to_string()))
    }

    /// Parse a schema from stored object content.
    pub fn from_content(content: &Content) -> SchemaResult<Self> {
        Self::from_json(&content.to_json())
    }

    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name.as_str(),
            "kind": self.kind.as_str(),
            "indexing": self.indexing,
            "shape": self.shape.to_json(),
        })
    }

    /// The content stored in a schema object: the definition plus a
    /// `$schema` reference to the meta-schema.
    pub fn to_stored_json(&self, meta_ref: &str) -> Value {
        let mut value = self.to_json();
        if let Value::Object(map) = &mut value {
            map.insert(SCHEMA_KEY.to_string(), json!(meta_ref));
        }
        value
    }

    /// Validate instance data.
    ///
    /// For maps `data` is the whole object; for lists and logs it is the
    /// array of items, each checked against the shape.
    pub fn validate_data(&self, data: &Value, mode: ValidationMode) -> SchemaResult<()> {
        let result = match self.kind {
            ObjectKind::Map => validate(&self.shape, data, mode),
            ObjectKind::List | ObjectKind::Log => match data {
                Value::Array(_) => validate(&Shape::array(self.shape.clone()), data, mode),
                Value::Null => Ok(()),
                other => {
                    return Err(self.violation(format!(
                        "{} content must be an array, got {other}",
                        self.kind
                    )))
                }
            },
        };
        result.map_err(|violations| SchemaError::Validation {
            schema: self.name.to_string(),
            violations,
        })
    }

    /// Validate a single list or log item.
    pub fn validate_item(&self, item: &Value) -> SchemaResult<()> {
        validate(&self.shape, item, ValidationMode::Full).map_err(|violations| {
            SchemaError::Validation {
                schema: self.name.to_string(),
                violations,
            }
        })
    }

    /// Names of the schemas this one references.
    pub fn references(&self) -> BTreeSet<SchemaName> {
        collect_refs(&self.shape)
    }

    /// Rewrite references to IDs; returns names with no known ID.
    pub fn resolve_references(&mut self, ids: &BTreeMap<SchemaName, ObjectId>) -> Vec<SchemaName> {
        resolve_refs(&mut self.shape, ids)
    }

    fn violation(&self, message: String) -> SchemaError {
        SchemaError::Validation {
            schema: self.name.to_string(),
            violations: vec![crate::validate::Violation {
                path: String::new(),
                message,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> SchemaDefinition {
        SchemaDefinition::from_json(&json!({
            "name": "app/schema/task",
            "indexing": true,
            "shape": {
                "type": "object",
                "properties": {"title": "string", "list": {"$co": "app/schema/list"}},
                "required": ["title"]
            }
        }))
        .unwrap()
    }

    #[test]
    fn parses_with_defaults() {
        let schema = task();
        assert_eq!(schema.kind, ObjectKind::Map);
        assert!(schema.indexing);

        let bare = SchemaDefinition::from_json(&json!({"name": "app/schema/note"})).unwrap();
        assert!(!bare.indexing);
        assert_eq!(bare.shape, Shape::Any);
    }

    #[test]
    fn rejects_bad_definitions() {
        assert!(SchemaDefinition::from_json(&json!({"kind": "map"})).is_err());
        assert!(SchemaDefinition::from_json(&json!({"name": "task"})).is_err());
        assert!(SchemaDefinition::from_json(&json!({"name": "a/schema/b", "kind": "tree"})).is_err());
        assert!(SchemaDefinition::from_json(&json!([1])).is_err());
    }

    #[test]
    fn stored_json_roundtrips_through_content() {
        let schema = task();
        let stored = schema.to_stored_json("@self");
        assert_eq!(stored["$schema"], json!("@self"));
        let content = Content::from_json(ObjectKind::Map, stored).unwrap();
        assert_eq!(SchemaDefinition::from_content(&content).unwrap(), schema);
    }

    #[test]
    fn validation_error_names_schema() {
        let err = task().validate_data(&json!({}), ValidationMode::Full).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("app/schema/task"));
        assert!(msg.contains("title"));
    }

    #[test]
    fn list_schema_validates_items() {
        let tags = SchemaDefinition::new(
            SchemaName::parse("app/schema/tags").unwrap(),
            ObjectKind::List,
            Shape::String,
        );
        assert!(tags.validate_data(&json!(["a", "b"]), ValidationMode::Full).is_ok());
        assert!(tags.validate_data(&json!(["a", 1]), ValidationMode::Full).is_err());
        assert!(tags.validate_data(&json!({"a": 1}), ValidationMode::Full).is_err());
        assert!(tags.validate_item(&json!("c")).is_ok());
    }

    #[test]
    fn references_resolve() {
        let mut schema = task();
        let list_name = SchemaName::parse("app/schema/list").unwrap();
        assert_eq!(schema.references(), BTreeSet::from([list_name.clone()]));
        let ids = BTreeMap::from([(list_name, ObjectId::from_bytes(b"list"))]);
        assert!(schema.resolve_references(&ids).is_empty());
        assert!(schema.references().is_empty());
    }
}
