use std::collections::BTreeMap;

use serde::Serialize;

use cairn_types::ObjectId;

/// Which part of a bundle a failed record came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Config,
    Data,
}

/// A config or data record that could not be seeded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    pub kind: RecordKind,
    /// Config key, or `<collection>[<index>]` for data records.
    pub key: String,
    pub error: String,
}

/// What a completed seed wrote.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    /// Bundle schemas by name.
    pub schemas: BTreeMap<String, ObjectId>,
    /// Config objects by key.
    pub configs: BTreeMap<String, ObjectId>,
    /// Data records by collection, in bundle order. Nested objects are not
    /// listed.
    pub data: BTreeMap<String, Vec<ObjectId>>,
    /// The full registry after seeding, meta-schema included.
    pub registry: BTreeMap<String, ObjectId>,
    pub failures: Vec<RecordFailure>,
}

/// Result of a seed call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SeedReport {
    Seeded(SeedSummary),
    /// Nothing was written.
    Skipped { reason: String },
}

impl SeedReport {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn summary(&self) -> Option<&SeedSummary> {
        match self {
            Self::Seeded(summary) => Some(summary),
            Self::Skipped { .. } => None,
        }
    }
}
