use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use cairn_types::{ObjectId, ObjectKind};

use crate::error::{StoreError, StoreResult};

/// Header metadata: free-form JSON keyed by string, sorted for stable hashing.
pub type Meta = BTreeMap<String, Value>;

/// Meta key holding the schema reference of an instance object.
pub const SCHEMA_KEY: &str = "$schema";

/// Meta key holding the structural type marker of an object.
pub const TYPE_KEY: &str = "type";

/// Key-derivation context for header hashing.
const HEADER_DOMAIN: &str = "cairn 2024 object header v1";

/// Values of the `type` meta key.
pub mod object_type {
    pub const ACCOUNT: &str = "account";
    pub const GROUP: &str = "group";
    pub const SCHEMA: &str = "schema";
    pub const REGISTRY_ROOT: &str = "registry-root";
    pub const SCHEMA_REGISTRY: &str = "schema-registry";
    pub const INDEX_MAP: &str = "index-map";
    pub const INDEX_LIST: &str = "index-list";
    pub const SEED_MANIFEST: &str = "seed-manifest";
    pub const REMOVED_SET: &str = "removed-set";

    /// Types that belong to principals, access control, or the
    /// registry/index machinery. Objects of these types are never indexed.
    pub fn is_internal(ty: &str) -> bool {
        matches!(
            ty,
            ACCOUNT
                | GROUP
                | REGISTRY_ROOT
                | SCHEMA_REGISTRY
                | INDEX_MAP
                | INDEX_LIST
                | SEED_MANIFEST
                | REMOVED_SET
        )
    }
}

/// Immutable object header.
///
/// The header is written once, with the object's first write message, and
/// its hash is the object ID.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Kind of the object's content.
    pub kind: ObjectKind,
    /// Owning access group, if any.
    pub group: Option<ObjectId>,
    /// Header metadata (schema reference, type marker).
    pub meta: Meta,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Nonce that keeps independently created headers distinct.
    pub uniqueness: String,
}

impl Header {
    /// Create a fresh header with a new uniqueness nonce.
    pub fn new(kind: ObjectKind, group: Option<ObjectId>, meta: Meta) -> Self {
        Self {
            kind,
            group,
            meta,
            created_at: Utc::now(),
            uniqueness: uuid::Uuid::now_v7().to_string(),
        }
    }

    /// Compute the content-addressed ID of this header.
    pub fn compute_id(&self) -> StoreResult<ObjectId> {
        let bytes =
            serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut hasher = blake3::Hasher::new_derive_key(HEADER_DOMAIN);
        hasher.update(&bytes);
        Ok(ObjectId::from_hash(*hasher.finalize().as_bytes()))
    }

    /// The raw schema reference from `meta["$schema"]`, if it is a string.
    pub fn schema_ref(&self) -> Option<&str> {
        self.meta.get(SCHEMA_KEY).and_then(Value::as_str)
    }

    /// The structural type marker from `meta["type"]`.
    pub fn object_type(&self) -> Option<&str> {
        self.meta.get(TYPE_KEY).and_then(Value::as_str)
    }

    /// Returns `true` if the header marks a principal, group, or registry object.
    pub fn is_internal(&self) -> bool {
        self.object_type().is_some_and(object_type::is_internal)
    }
}

/// Build a [`Meta`] from `(key, value)` pairs.
pub fn meta<I, K>(pairs: I) -> Meta
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_is_stable_for_same_header() {
        let header = Header::new(ObjectKind::Map, None, Meta::new());
        assert_eq!(header.compute_id().unwrap(), header.compute_id().unwrap());
    }

    #[test]
    fn fresh_headers_get_distinct_ids() {
        let a = Header::new(ObjectKind::Map, None, Meta::new());
        let b = Header::new(ObjectKind::Map, None, Meta::new());
        assert_ne!(a.compute_id().unwrap(), b.compute_id().unwrap());
    }

    #[test]
    fn schema_ref_and_type() {
        let header = Header::new(
            ObjectKind::List,
            None,
            meta([("$schema", json!("co_x")), ("type", json!("index-list"))]),
        );
        assert_eq!(header.schema_ref(), Some("co_x"));
        assert_eq!(header.object_type(), Some(object_type::INDEX_LIST));
        assert!(header.is_internal());
    }

    #[test]
    fn schema_type_is_not_internal() {
        assert!(!object_type::is_internal(object_type::SCHEMA));
        assert!(object_type::is_internal(object_type::GROUP));
    }
}
