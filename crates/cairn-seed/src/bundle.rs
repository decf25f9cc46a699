//! Seed bundle format.
//!
//! ```json
//! {
//!   "schemas": [{"name": "app/schema/task", "indexing": true, "shape": {..}}],
//!   "configs": [{"key": "main-view", "schema": "app/schema/view",
//!                "category": "view", "data": {"style": {"$config": "dark"}}}],
//!   "data": {"tasks": [{"schema": "app/schema/task", "data": {..}}]},
//!   "options": {"force_fresh_seed": false}
//! }
//! ```
//!
//! Config fields may reference sibling configs with `{"$config": "<key>"}`.
//! Data fields may embed an object to create first with
//! `{"$nested": {"schema": "<name>", "data": ..}}`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use cairn_schema::{is_meta_schema_name, SchemaDefinition};
use cairn_types::ObjectId;

use crate::error::{SeedError, SeedResult};

pub const CONFIG_REF_KEY: &str = "$config";
pub const NESTED_KEY: &str = "$nested";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedOptions {
    /// Seed even if the store is already bootstrapped, replacing the
    /// instances the last seed created.
    pub force_fresh_seed: bool,
}

/// Everything one seed run writes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedBundle {
    /// Schema definitions in JSON form.
    pub schemas: Vec<Value>,
    pub configs: Vec<ConfigSpec>,
    /// Data records by collection.
    pub data: BTreeMap<String, Vec<DataRecord>>,
    pub options: SeedOptions,
}

/// Creation priority of configuration objects. Lower variants are created
/// first.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ConfigCategory {
    Style,
    View,
    Context,
    State,
    Interface,
    Actor,
    #[default]
    Other,
}

/// A configuration object to seed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigSpec {
    /// Bundle-local key other configs use to reference this one.
    pub key: String,
    /// Schema name or ID.
    pub schema: String,
    #[serde(default)]
    pub category: ConfigCategory,
    #[serde(default)]
    pub data: Value,
}

/// A data record to seed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataRecord {
    /// Schema name or ID.
    pub schema: String,
    #[serde(default)]
    pub data: Value,
}

/// Payload of a `{"$nested": ..}` field.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NestedRecord {
    pub schema: String,
    #[serde(default)]
    pub data: Value,
}

impl SeedBundle {
    pub fn from_json_str(json: &str) -> SeedResult<Self> {
        serde_json::from_str(json).map_err(|e| SeedError::InvalidBundle(e.to_string()))
    }

    /// Parsed schema definitions, one per name (first definition wins).
    /// The built-in meta-schema cannot be redefined.
    pub fn schema_definitions(&self) -> SeedResult<Vec<SchemaDefinition>> {
        let mut seen = BTreeSet::new();
        let mut definitions = Vec::new();
        for value in &self.schemas {
            let definition = SchemaDefinition::from_json(value)?;
            if is_meta_schema_name(definition.name.as_str()) {
                warn!(name = %definition.name, "bundle redefines the meta-schema; ignoring");
                continue;
            }
            if !seen.insert(definition.name.clone()) {
                warn!(name = %definition.name, "duplicate schema definition; keeping the first");
                continue;
            }
            definitions.push(definition);
        }
        Ok(definitions)
    }

    /// Configs in creation order: by category, then bundle order.
    pub fn ordered_configs(&self) -> Vec<&ConfigSpec> {
        let mut configs: Vec<&ConfigSpec> = self.configs.iter().collect();
        configs.sort_by_key(|c| c.category);
        configs
    }

    /// Check bundle-level invariants that do not need a store.
    pub fn check(&self) -> SeedResult<()> {
        self.schema_definitions()?;
        let mut keys = BTreeSet::new();
        for config in &self.configs {
            if !keys.insert(config.key.as_str()) {
                return Err(SeedError::InvalidBundle(format!(
                    "duplicate config key {:?}",
                    config.key
                )));
            }
        }
        for config in &self.configs {
            let missing: Vec<String> = config_refs(&config.data)
                .into_iter()
                .filter(|key| !keys.contains(key.as_str()))
                .collect();
            if !missing.is_empty() {
                return Err(SeedError::InvalidBundle(format!(
                    "config {:?} references unknown configs: {}",
                    config.key,
                    missing.join(", ")
                )));
            }
        }
        Ok(())
    }
}

impl ConfigSpec {
    pub fn has_refs(&self) -> bool {
        !config_refs(&self.data).is_empty()
    }
}

fn as_config_ref(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) if map.len() == 1 => map.get(CONFIG_REF_KEY).and_then(Value::as_str),
        _ => None,
    }
}

/// Every config key referenced anywhere in `value`.
pub fn config_refs(value: &Value) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    collect_config_refs(value, &mut keys);
    keys
}

fn collect_config_refs(value: &Value, keys: &mut BTreeSet<String>) {
    if let Some(key) = as_config_ref(value) {
        keys.insert(key.to_string());
        return;
    }
    match value {
        Value::Array(items) => items.iter().for_each(|v| collect_config_refs(v, keys)),
        Value::Object(map) => map.values().for_each(|v| collect_config_refs(v, keys)),
        _ => {}
    }
}

/// `data` without the top-level fields that contain config references.
pub fn strip_config_refs(data: &Value) -> Value {
    match data {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| config_refs(v).is_empty())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Only the top-level fields of `data` that contain config references.
pub fn config_ref_fields(data: &Value) -> Map<String, Value> {
    match data {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| !config_refs(v).is_empty())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        _ => Map::new(),
    }
}

/// Replace every config reference in `value` with the referenced object's
/// ID. Errors with the first unknown key.
pub fn resolve_config_refs(value: &Value, ids: &BTreeMap<String, ObjectId>) -> Result<Value, String> {
    if let Some(key) = as_config_ref(value) {
        return ids
            .get(key)
            .map(|id| Value::String(id.to_string()))
            .ok_or_else(|| key.to_string());
    }
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| resolve_config_refs(v, ids))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| Ok((k.clone(), resolve_config_refs(v, ids)?)))
            .collect::<Result<Map<_, _>, String>>()
            .map(Value::Object),
        other => Ok(other.clone()),
    }
}

/// The nested record in a `{"$nested": ..}` field, if `value` is one.
pub fn as_nested(value: &Value) -> Option<Result<NestedRecord, serde_json::Error>> {
    match value {
        Value::Object(map) if map.len() == 1 => map
            .get(NESTED_KEY)
            .map(|nested| serde_json::from_value(nested.clone())),
        _ => None,
    }
}
