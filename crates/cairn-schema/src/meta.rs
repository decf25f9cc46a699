//! The meta-schema: the schema every stored schema object validates against,
//! including itself.
//!
//! Its stored `$schema` field must point at its own object ID, which is only
//! known after creation. Seeding writes [`SELF_PLACEHOLDER`] first and
//! patches the real ID in afterwards.

use serde_json::json;

use cairn_types::{ObjectKind, SchemaName};

use crate::definition::SchemaDefinition;
use crate::shape::Shape;

pub const META_SCHEMA_NAME: &str = "cairn/schema/meta";

/// Temporary self-reference written before the meta-schema's ID exists.
pub const SELF_PLACEHOLDER: &str = "@self";

/// The meta-schema definition.
pub fn meta_schema() -> SchemaDefinition {
    let shape = Shape::Object {
        properties: [
            ("name", Shape::String),
            (
                "kind",
                Shape::Enum(vec![json!("map"), json!("list"), json!("log")]),
            ),
            ("indexing", Shape::Bool),
            ("shape", Shape::Any),
            ("$schema", Shape::String),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect(),
        required: ["name", "kind", "$schema"]
            .into_iter()
            .map(str::to_string)
            .collect(),
        additional: false,
    };
    SchemaDefinition {
        name: meta_name(),
        kind: ObjectKind::Map,
        indexing: false,
        shape,
    }
}

pub fn is_meta_schema_name(name: &str) -> bool {
    name == META_SCHEMA_NAME
}

fn meta_name() -> SchemaName {
    SchemaName::parse(META_SCHEMA_NAME).unwrap_or_else(|_| unreachable!("meta-schema name is valid"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidationMode;

    #[test]
    fn meta_schema_validates_itself() {
        let meta = meta_schema();
        let stored = meta.to_stored_json(SELF_PLACEHOLDER);
        meta.validate_data(&stored, ValidationMode::Full).unwrap();
    }

    #[test]
    fn meta_schema_validates_other_schemas() {
        let meta = meta_schema();
        let task = SchemaDefinition::from_json(&json!({
            "name": "app/schema/task",
            "kind": "list",
            "shape": "string"
        }))
        .unwrap();
        meta.validate_data(&task.to_stored_json("co_x"), ValidationMode::Full)
            .unwrap();
        assert!(meta
            .validate_data(&json!({"name": "app/schema/x", "kind": "tree", "$schema": "x"}), ValidationMode::Full)
            .is_err());
        assert!(meta.validate_data(&task.to_json(), ValidationMode::Full).is_err());
    }

    #[test]
    fn name_check() {
        assert!(is_meta_schema_name("cairn/schema/meta"));
        assert!(!is_meta_schema_name("app/schema/meta"));
    }
}
