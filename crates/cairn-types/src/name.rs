//! Namespaced schema names.
//!
//! A schema name has the form `<namespace>/schema/<path>`, e.g.
//! `todos/schema/task` or `ui/schema/view/list`:
//! - at least three `/`-separated segments
//! - the second segment is the literal `schema`
//! - no empty segments, no whitespace

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

const SCHEMA_SEGMENT: &str = "schema";

/// A validated, namespaced schema name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaName(String);

impl SchemaName {
    /// Parse and validate a schema name.
    pub fn parse(name: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidSchemaName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.chars().any(char::is_whitespace) {
            return Err(invalid("must not contain whitespace"));
        }
        let segments: Vec<&str> = name.split('/').collect();
        if segments.len() < 3 {
            return Err(invalid("expected <namespace>/schema/<name>"));
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid("segments must be non-empty"));
        }
        if segments[1] != SCHEMA_SEGMENT {
            return Err(invalid("second segment must be 'schema'"));
        }
        Ok(Self(name.to_string()))
    }

    /// Returns `true` if `name` is a validly namespaced schema name.
    pub fn is_valid(name: &str) -> bool {
        Self::parse(name).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The namespace segment (`todos` in `todos/schema/task`).
    pub fn namespace(&self) -> &str {
        self.0.split('/').next().unwrap_or_default()
    }

    /// Everything after `<namespace>/schema/`.
    pub fn local_name(&self) -> &str {
        let prefix_len = self.namespace().len() + 1 + SCHEMA_SEGMENT.len() + 1;
        &self.0[prefix_len..]
    }
}

impl fmt::Debug for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaName({})", self.0)
    }
}

impl fmt::Display for SchemaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SchemaName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for SchemaName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for SchemaName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SchemaName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
