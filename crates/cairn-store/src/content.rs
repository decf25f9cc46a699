use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use cairn_types::{ObjectId, ObjectKind};

use crate::error::{StoreError, StoreResult};

/// A single mutation on object content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    /// Set a key on a map.
    Set { key: String, value: Value },
    /// Remove a key from a map.
    Delete { key: String },
    /// Append an item to a list.
    Append { value: Value },
    /// Remove the list item at a position.
    DeleteAt { index: usize },
    /// Push an entry onto a log.
    Push { value: Value },
}

impl Op {
    /// The content kind this op applies to.
    pub fn target_kind(&self) -> ObjectKind {
        match self {
            Self::Set { .. } | Self::Delete { .. } => ObjectKind::Map,
            Self::Append { .. } | Self::DeleteAt { .. } => ObjectKind::List,
            Self::Push { .. } => ObjectKind::Log,
        }
    }
}

/// Current content of an object, tagged by kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Content {
    Map(BTreeMap<String, Value>),
    List(Vec<Value>),
    Log(Vec<Value>),
}

impl Content {
    /// Empty content of the given kind.
    pub fn empty(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Map => Self::Map(BTreeMap::new()),
            ObjectKind::List => Self::List(Vec::new()),
            ObjectKind::Log => Self::Log(Vec::new()),
        }
    }

    /// Build content of `kind` from JSON: an object for maps, an array for
    /// lists and logs. `null` yields empty content.
    pub fn from_json(kind: ObjectKind, value: Value) -> StoreResult<Self> {
        match (kind, value) {
            (_, Value::Null) => Ok(Self::empty(kind)),
            (ObjectKind::Map, Value::Object(map)) => Ok(Self::Map(map.into_iter().collect())),
            (ObjectKind::List, Value::Array(items)) => Ok(Self::List(items)),
            (ObjectKind::Log, Value::Array(items)) => Ok(Self::Log(items)),
            (kind, other) => Err(StoreError::InvalidContent(format!(
                "{kind} content must be built from {}, got {}",
                if kind == ObjectKind::Map { "an object" } else { "an array" },
                json_type_name(&other)
            ))),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Map(_) => ObjectKind::Map,
            Self::List(_) => ObjectKind::List,
            Self::Log(_) => ObjectKind::Log,
        }
    }

    /// JSON rendering: an object for maps, an array otherwise.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Map(map) => Value::Object(map.clone().into_iter().collect()),
            Self::List(items) | Self::Log(items) => Value::Array(items.clone()),
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Value under `key` for maps; `None` for lists and logs.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// String value under `key` for maps.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Object ID stored under `key`, if present and well-formed.
    pub fn get_id(&self, key: &str) -> Option<ObjectId> {
        self.get_str(key).and_then(|s| ObjectId::parse(s).ok())
    }

    /// Map keys, in order.
    pub fn keys(&self) -> Vec<&str> {
        self.as_map()
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Items of a list or log; empty for maps.
    pub fn items(&self) -> &[Value] {
        match self {
            Self::List(items) | Self::Log(items) => items,
            Self::Map(_) => &[],
        }
    }

    /// Items that parse as object IDs, in order.
    pub fn id_items(&self) -> Vec<ObjectId> {
        self.items()
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|s| ObjectId::parse(s).ok())
            .collect()
    }

    /// Number of keys (maps) or items (lists, logs).
    pub fn len(&self) -> usize {
        match self {
            Self::Map(map) => map.len(),
            Self::List(items) | Self::Log(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if a list or log contains `value`.
    pub fn contains_item(&self, value: &Value) -> bool {
        self.items().contains(value)
    }

    /// Positions of every occurrence of `value` in a list or log.
    pub fn positions_of(&self, value: &Value) -> Vec<usize> {
        self.items()
            .iter()
            .enumerate()
            .filter(|(_, item)| *item == value)
            .map(|(i, _)| i)
            .collect()
    }

    /// Ops that rebuild this content from empty.
    pub fn to_ops(&self) -> Vec<Op> {
        match self {
            Self::Map(map) => map
                .iter()
                .map(|(k, v)| Op::Set {
                    key: k.clone(),
                    value: v.clone(),
                })
                .collect(),
            Self::List(items) => items
                .iter()
                .map(|v| Op::Append { value: v.clone() })
                .collect(),
            Self::Log(items) => items.iter().map(|v| Op::Push { value: v.clone() }).collect(),
        }
    }

    /// Apply a single op.
    pub fn apply(&mut self, op: &Op) -> StoreResult<()> {
        match (self, op) {
            (Self::Map(map), Op::Set { key, value }) => {
                map.insert(key.clone(), value.clone());
            }
            (Self::Map(map), Op::Delete { key }) => {
                map.remove(key);
            }
            (Self::List(items), Op::Append { value }) => items.push(value.clone()),
            (Self::List(items), Op::DeleteAt { index }) => {
                if *index >= items.len() {
                    return Err(StoreError::IndexOutOfBounds {
                        index: *index,
                        len: items.len(),
                    });
                }
                items.remove(*index);
            }
            (Self::Log(items), Op::Push { value }) => items.push(value.clone()),
            (content, op) => {
                return Err(StoreError::KindMismatch {
                    expected: op.target_kind(),
                    actual: content.kind(),
                })
            }
        }
        Ok(())
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn map_set_and_delete() {
        let mut content = Content::empty(ObjectKind::Map);
        content
            .apply(&Op::Set {
                key: "title".into(),
                value: json!("write docs"),
            })
            .unwrap();
        assert_eq!(content.get_str("title"), Some("write docs"));
        content.apply(&Op::Delete { key: "title".into() }).unwrap();
        assert!(content.is_empty());
    }

    #[test]
    fn list_append_and_delete_at() {
        let mut content = Content::from_json(ObjectKind::List, json!(["a", "b", "c"])).unwrap();
        content.apply(&Op::DeleteAt { index: 1 }).unwrap();
        assert_eq!(content.to_json(), json!(["a", "c"]));
        let err = content.apply(&Op::DeleteAt { index: 5 }).unwrap_err();
        assert!(matches!(err, StoreError::IndexOutOfBounds { index: 5, len: 2 }));
    }

    #[test]
    fn log_push_keeps_duplicates() {
        let mut content = Content::empty(ObjectKind::Log);
        content.apply(&Op::Push { value: json!("a") }).unwrap();
        content.apply(&Op::Push { value: json!("a") }).unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content.positions_of(&json!("a")), vec![0, 1]);
    }

    #[test]
    fn op_kind_mismatch_is_rejected() {
        let mut content = Content::empty(ObjectKind::Log);
        let err = content.apply(&Op::Append { value: json!(1) }).unwrap_err();
        assert!(matches!(
            err,
            StoreError::KindMismatch {
                expected: ObjectKind::List,
                actual: ObjectKind::Log
            }
        ));
    }

    #[test]
    fn from_json_rejects_wrong_shape() {
        assert!(Content::from_json(ObjectKind::Map, json!([1, 2])).is_err());
        assert!(Content::from_json(ObjectKind::List, json!({"a": 1})).is_err());
        assert!(Content::from_json(ObjectKind::Log, Value::Null)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn to_ops_rebuilds_content() {
        let original = Content::from_json(ObjectKind::Map, json!({"a": 1, "b": [true]})).unwrap();
        let mut rebuilt = Content::empty(ObjectKind::Map);
        for op in original.to_ops() {
            rebuilt.apply(&op).unwrap();
        }
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn id_items_skip_non_ids() {
        let id = ObjectId::from_bytes(b"x");
        let content =
            Content::from_json(ObjectKind::List, json!([id.to_string(), "junk", 3])).unwrap();
        assert_eq!(content.id_items(), vec![id]);
    }
}
