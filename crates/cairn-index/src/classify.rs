use serde::Serialize;

use cairn_types::ObjectId;

/// Where an object belongs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum Classification {
    /// Principal, access group, or registry/index machinery. Never indexed.
    Internal,
    /// A schema object. Registered, never indexed.
    Schema,
    /// No schema reference; belongs in the unclassified list.
    Unclassified,
    /// Its schema has indexing enabled.
    Indexed { schema: ObjectId },
    /// Its schema has indexing disabled; left out of every index.
    Unindexed { schema: ObjectId },
}

impl Classification {
    /// The referenced schema, if any.
    pub fn schema(&self) -> Option<ObjectId> {
        match self {
            Self::Indexed { schema } | Self::Unindexed { schema } => Some(*schema),
            _ => None,
        }
    }

    pub fn should_index(&self) -> bool {
        matches!(self, Self::Indexed { .. })
    }
}
