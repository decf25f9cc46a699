use serde::{Deserialize, Serialize};

use cairn_store::{CoStore, Content};
use cairn_types::ObjectId;

pub const REGISTRY_KEY: &str = "registry";
pub const SCHEMAS_KEY: &str = "schemas";
pub const INDEXES_KEY: &str = "indexes";
pub const UNCLASSIFIED_KEY: &str = "unclassified";
pub const MANIFEST_KEY: &str = "manifest";
pub const REMOVED_KEY: &str = "removed";

/// Resolved IDs of a loaded registry root and its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRoot {
    pub id: ObjectId,
    /// Map: schema name -> schema object ID.
    pub schemas: ObjectId,
    /// Map: schema object ID -> index list ID.
    pub indexes: ObjectId,
    /// List of unclassified object IDs.
    pub unclassified: ObjectId,
    /// List of instance IDs created by the last seed.
    pub manifest: ObjectId,
    /// Map: object ID -> removal time. Removed objects are never indexed
    /// again.
    pub removed: ObjectId,
}

impl RegistryRoot {
    /// Every object ID the root consists of.
    pub fn ids(&self) -> [ObjectId; 6] {
        [
            self.id,
            self.schemas,
            self.indexes,
            self.unclassified,
            self.manifest,
            self.removed,
        ]
    }

    /// Returns `true` if the root and all its children are loaded locally.
    pub fn is_available(&self, store: &dyn CoStore) -> bool {
        self.ids().iter().all(|id| store.is_available(id))
    }
}

/// What a map entry pointing at another object currently resolves to.
///
/// Get-or-create logic only creates on [`ChildRef::Absent`]; an
/// [`ChildRef::Unavailable`] reference must be left alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildRef {
    Absent,
    Available(ObjectId),
    Unavailable(ObjectId),
}

impl ChildRef {
    /// Inspect `content[key]`. A value that is not a well-formed ID counts as
    /// unavailable: it is something, and must not be overwritten.
    pub fn of(store: &dyn CoStore, content: &Content, key: &str) -> Self {
        match content.get(key) {
            None => Self::Absent,
            Some(value) => match value.as_str().and_then(|s| ObjectId::parse(s).ok()) {
                Some(id) if store.is_available(&id) => Self::Available(id),
                Some(id) => Self::Unavailable(id),
                None => Self::Unavailable(ObjectId::null()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_store::InMemoryCoStore;
    use cairn_types::ObjectKind;
    use serde_json::json;

    #[test]
    fn child_ref_distinguishes_states() {
        let store = InMemoryCoStore::new();
        let present = store
            .create_object(ObjectKind::List, None, None, Default::default())
            .unwrap()
            .id;
        let missing = ObjectId::from_bytes(b"elsewhere");
        let content = Content::from_json(
            ObjectKind::Map,
            json!({"a": present.to_string(), "b": missing.to_string(), "c": 7}),
        )
        .unwrap();

        assert_eq!(ChildRef::of(&store, &content, "a"), ChildRef::Available(present));
        assert_eq!(ChildRef::of(&store, &content, "b"), ChildRef::Unavailable(missing));
        assert!(matches!(ChildRef::of(&store, &content, "c"), ChildRef::Unavailable(_)));
        assert_eq!(ChildRef::of(&store, &content, "d"), ChildRef::Absent);
    }
}
