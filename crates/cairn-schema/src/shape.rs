//! The shape AST.
//!
//! Shapes are written as a JSON-Schema-like subset:
//!
//! | JSON | Shape |
//! |---|---|
//! | `{}` or `{"type": "any"}` | [`Shape::Any`] |
//! | `{"type": "string"}` (or just `"string"`) | [`Shape::String`] |
//! | `{"type": "object", "properties": {..}, "required": [..], "additionalProperties": false}` | [`Shape::Object`] |
//! | `{"type": "array", "items": {..}}` | [`Shape::Array`] |
//! | `{"enum": [..]}` | [`Shape::Enum`] |
//! | `{"anyOf": [..]}` | [`Shape::AnyOf`] |
//! | `{"$co": "ns/schema/x"}` or `{"$co": "co_.."}` | [`Shape::Ref`] |

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

use cairn_types::{ObjectId, SchemaName};

use crate::error::{SchemaError, SchemaResult};

/// Key marking a reference to another schema's instances.
pub const REF_KEY: &str = "$co";

/// Target of a schema reference: symbolic before seeding resolves it, an
/// object ID afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaRef {
    Name(SchemaName),
    Id(ObjectId),
}

impl SchemaRef {
    /// Parse either an object ID or a namespaced schema name.
    pub fn parse(s: &str) -> SchemaResult<Self> {
        if ObjectId::looks_like(s) {
            return Ok(Self::Id(ObjectId::parse(s)?));
        }
        Ok(Self::Name(SchemaName::parse(s)?))
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Id(_))
    }
}

impl fmt::Display for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Constraint on a JSON value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Shape {
    #[default]
    Any,
    Null,
    Bool,
    Number,
    Integer,
    String,
    Object {
        properties: BTreeMap<String, Shape>,
        required: BTreeSet<String>,
        additional: bool,
    },
    Array {
        items: Box<Shape>,
    },
    Enum(Vec<Value>),
    AnyOf(Vec<Shape>),
    /// A reference (object ID string) to an instance of another schema.
    Ref(SchemaRef),
}

impl Shape {
    /// An open object shape with the given properties and required keys.
    pub fn object<P, R>(properties: P, required: R) -> Self
    where
        P: IntoIterator<Item = (&'static str, Shape)>,
        R: IntoIterator<Item = &'static str>,
    {
        Self::Object {
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            required: required.into_iter().map(str::to_string).collect(),
            additional: true,
        }
    }

    pub fn array(items: Shape) -> Self {
        Self::Array {
            items: Box::new(items),
        }
    }

    /// Shape of a named property, for object shapes.
    pub fn property(&self, name: &str) -> Option<&Shape> {
        match self {
            Self::Object { properties, .. } => properties.get(name),
            _ => None,
        }
    }

    /// Parse a shape from its JSON form.
    pub fn from_json(value: &Value) -> SchemaResult<Self> {
        parse(value, "")
    }

    /// Render the shape back to JSON.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Any => json!({}),
            Self::Null => json!({"type": "null"}),
            Self::Bool => json!({"type": "boolean"}),
            Self::Number => json!({"type": "number"}),
            Self::Integer => json!({"type": "integer"}),
            Self::String => json!({"type": "string"}),
            Self::Object {
                properties,
                required,
                additional,
            } => {
                let mut out = Map::new();
                out.insert("type".into(), json!("object"));
                let props: Map<String, Value> = properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                out.insert("properties".into(), Value::Object(props));
                if !required.is_empty() {
                    out.insert("required".into(), json!(required));
                }
                if !additional {
                    out.insert("additionalProperties".into(), json!(false));
                }
                Value::Object(out)
            }
            Self::Array { items } => json!({"type": "array", "items": items.to_json()}),
            Self::Enum(values) => json!({ "enum": values }),
            Self::AnyOf(shapes) => {
                json!({ "anyOf": shapes.iter().map(Shape::to_json).collect::<Vec<_>>() })
            }
            Self::Ref(reference) => json!({ REF_KEY: reference.to_string() }),
        }
    }
}

fn parse(value: &Value, path: &str) -> SchemaResult<Shape> {
    match value {
        Value::String(ty) => parse_type(ty, &Map::new(), path),
        Value::Object(obj) => {
            if let Some(target) = obj.get(REF_KEY) {
                let target = target
                    .as_str()
                    .ok_or_else(|| SchemaError::shape(path, "$co must be a string"))?;
                return Ok(Shape::Ref(SchemaRef::parse(target)?));
            }
            if let Some(values) = obj.get("enum") {
                let values = values
                    .as_array()
                    .ok_or_else(|| SchemaError::shape(path, "enum must be an array"))?;
                return Ok(Shape::Enum(values.clone()));
            }
            if let Some(options) = obj.get("anyOf") {
                let options = options
                    .as_array()
                    .ok_or_else(|| SchemaError::shape(path, "anyOf must be an array"))?;
                let shapes = options
                    .iter()
                    .enumerate()
                    .map(|(i, v)| parse(v, &format!("{path}/anyOf/{i}")))
                    .collect::<SchemaResult<Vec<_>>>()?;
                return Ok(Shape::AnyOf(shapes));
            }
            match obj.get("type") {
                Some(Value::String(ty)) => parse_type(ty, obj, path),
                Some(_) => Err(SchemaError::shape(path, "type must be a string")),
                None if obj.contains_key("properties") => parse_type("object", obj, path),
                None if obj.contains_key("items") => parse_type("array", obj, path),
                None => Ok(Shape::Any),
            }
        }
        other => Err(SchemaError::shape(
            path,
            format!("expected a shape object, got {other}"),
        )),
    }
}

fn parse_type(ty: &str, obj: &Map<String, Value>, path: &str) -> SchemaResult<Shape> {
    match ty {
        "any" => Ok(Shape::Any),
        "null" => Ok(Shape::Null),
        "boolean" => Ok(Shape::Bool),
        "number" => Ok(Shape::Number),
        "integer" => Ok(Shape::Integer),
        "string" => Ok(Shape::String),
        "object" => {
            let mut properties = BTreeMap::new();
            if let Some(props) = obj.get("properties") {
                let props = props
                    .as_object()
                    .ok_or_else(|| SchemaError::shape(path, "properties must be an object"))?;
                for (key, value) in props {
                    properties.insert(key.clone(), parse(value, &format!("{path}/{key}"))?);
                }
            }
            let mut required = BTreeSet::new();
            if let Some(req) = obj.get("required") {
                let req = req
                    .as_array()
                    .ok_or_else(|| SchemaError::shape(path, "required must be an array"))?;
                for key in req {
                    let key = key
                        .as_str()
                        .ok_or_else(|| SchemaError::shape(path, "required entries must be strings"))?;
                    required.insert(key.to_string());
                }
            }
            let additional = obj
                .get("additionalProperties")
                .map(|v| v.as_bool().unwrap_or(true))
                .unwrap_or(true);
            Ok(Shape::Object {
                properties,
                required,
                additional,
            })
        }
        "array" => {
            let items = match obj.get("items") {
                Some(items) => parse(items, &format!("{path}/items"))?,
                None => Shape::Any,
            };
            Ok(Shape::array(items))
        }
        other => Err(SchemaError::shape(path, format!("unknown type {other:?}"))),
    }
}

impl Serialize for Shape {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Shape {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Shape::from_json(&value).map_err(serde::de::Error::custom)
    }
}
