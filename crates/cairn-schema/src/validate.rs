//! Shape validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use cairn_types::ObjectId;

use crate::shape::Shape;

/// How strictly `required` is enforced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Every constraint, including required properties.
    #[default]
    Full,
    /// Types and enums only; missing required properties are allowed.
    /// Used for bare objects that are back-filled later.
    Partial,
}

/// A single validation failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// JSON-pointer-like location of the offending value.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{path}: {}", self.message)
    }
}

/// Validate `value` against `shape`, collecting every violation.
pub fn validate(shape: &Shape, value: &Value, mode: ValidationMode) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();
    check(shape, value, mode, "", &mut violations);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

fn check(shape: &Shape, value: &Value, mode: ValidationMode, path: &str, out: &mut Vec<Violation>) {
    let mut fail = |message: String| {
        out.push(Violation {
            path: path.to_string(),
            message,
        })
    };

    match shape {
        Shape::Any => {}
        Shape::Null if !value.is_null() => fail(expected("null", value)),
        Shape::Bool if !value.is_boolean() => fail(expected("boolean", value)),
        Shape::Number if !value.is_number() => fail(expected("number", value)),
        Shape::Integer if !is_integer(value) => fail(expected("integer", value)),
        Shape::String if !value.is_string() => fail(expected("string", value)),
        Shape::Null | Shape::Bool | Shape::Number | Shape::Integer | Shape::String => {}
        Shape::Enum(allowed) => {
            if !allowed.contains(value) {
                fail(format!("{value} is not one of {}", Value::Array(allowed.clone())));
            }
        }
        Shape::Ref(reference) => match value.as_str() {
            Some(s) if ObjectId::parse(s).is_ok() => {}
            _ => fail(format!("expected an object ID referencing {reference}, got {value}")),
        },
        Shape::AnyOf(options) => {
            let matched = options
                .iter()
                .any(|option| validate(option, value, mode).is_ok());
            if !matched {
                fail(format!("{value} matches none of {} alternatives", options.len()));
            }
        }
        Shape::Array { items } => match value.as_array() {
            Some(values) => {
                for (i, item) in values.iter().enumerate() {
                    check(items, item, mode, &format!("{path}/{i}"), out);
                }
            }
            None => fail(expected("array", value)),
        },
        Shape::Object {
            properties,
            required,
            additional,
        } => {
            let Some(map) = value.as_object() else {
                fail(expected("object", value));
                return;
            };
            if mode == ValidationMode::Full {
                for key in required {
                    if !map.contains_key(key) {
                        out.push(Violation {
                            path: path.to_string(),
                            message: format!("missing required property {key:?}"),
                        });
                    }
                }
            }
            for (key, child) in map {
                let child_path = format!("{path}/{key}");
                match properties.get(key) {
                    Some(shape) => check(shape, child, mode, &child_path, out),
                    None if !additional => out.push(Violation {
                        path: child_path,
                        message: "unexpected property".into(),
                    }),
                    None => {}
                }
            }
        }
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
        _ => false,
    }
}

fn expected(what: &str, got: &Value) -> String {
    format!("expected {what}, got {got}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task_shape() -> Shape {
        Shape::from_json(&json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "done": {"type": "boolean"},
                "priority": {"enum": ["low", "high"]},
                "owner": {"$co": "app/schema/person"},
                "estimate": {"type": "integer"}
            },
            "required": ["title", "done"],
            "additionalProperties": false
        }))
        .unwrap()
    }

    #[test]
    fn accepts_valid_object() {
        let owner = ObjectId::from_bytes(b"owner").to_string();
        let value = json!({"title": "a", "done": false, "priority": "low", "owner": owner, "estimate": 3});
        assert!(validate(&task_shape(), &value, ValidationMode::Full).is_ok());
    }

    #[test]
    fn reports_every_violation_with_path() {
        let value = json!({"done": "no", "priority": "urgent", "color": "red", "estimate": 1.5});
        let violations = validate(&task_shape(), &value, ValidationMode::Full).unwrap_err();
        let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["", "/color", "/done", "/estimate", "/priority"]);
        assert!(violations[0].message.contains("title"));
    }

    #[test]
    fn partial_mode_skips_required() {
        let value = json!({"priority": "high"});
        assert!(validate(&task_shape(), &value, ValidationMode::Full).is_err());
        assert!(validate(&task_shape(), &value, ValidationMode::Partial).is_ok());
    }

    #[test]
    fn partial_mode_still_checks_types() {
        let value = json!({"done": 1});
        assert!(validate(&task_shape(), &value, ValidationMode::Partial).is_err());
    }

    #[test]
    fn refs_require_object_ids() {
        let shape = Shape::from_json(&json!({"$co": "app/schema/person"})).unwrap();
        assert!(validate(&shape, &json!("app/schema/person"), ValidationMode::Full).is_err());
        let id = ObjectId::from_bytes(b"p").to_string();
        assert!(validate(&shape, &json!(id), ValidationMode::Full).is_ok());
    }

    #[test]
    fn any_of_accepts_any_alternative() {
        let shape = Shape::AnyOf(vec![Shape::Null, Shape::Integer]);
        assert!(validate(&shape, &json!(null), ValidationMode::Full).is_ok());
        assert!(validate(&shape, &json!(4), ValidationMode::Full).is_ok());
        assert!(validate(&shape, &json!("4"), ValidationMode::Full).is_err());
    }

    proptest::proptest! {
        #[test]
        fn full_validity_implies_partial_validity(title in "[a-z]{0,8}", done in proptest::option::of(proptest::bool::ANY)) {
            let mut value = json!({"title": title});
            if let Some(done) = done {
                value["done"] = json!(done);
            }
            if validate(&task_shape(), &value, ValidationMode::Full).is_ok() {
                proptest::prop_assert!(validate(&task_shape(), &value, ValidationMode::Partial).is_ok());
            }
            proptest::prop_assert!(validate(&task_shape(), &value, ValidationMode::Partial).is_ok());
        }
    }

    #[test]
    fn violation_display() {
        let v = Violation {
            path: String::new(),
            message: "boom".into(),
        };
        assert_eq!(v.to_string(), "/: boom");
    }
}
