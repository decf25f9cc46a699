use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use cairn_schema::{SchemaDefinition, META_SCHEMA_NAME};
use cairn_store::{meta, object_type, CoStore, Content, Header, StoreError, TYPE_KEY};
use cairn_types::{ObjectId, ObjectKind, SchemaName};

use crate::error::{RegistryError, RegistryResult};
use crate::root::{
    ChildRef, RegistryRoot, INDEXES_KEY, MANIFEST_KEY, REGISTRY_KEY, REMOVED_KEY, SCHEMAS_KEY,
    UNCLASSIFIED_KEY,
};
use crate::state::RegistryState;

/// Result of a registration attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegisterOutcome {
    /// The name was free and now maps to the schema.
    Registered,
    /// The name already maps to this schema.
    AlreadyRegistered,
    /// The name maps to a different schema; the mapping was kept.
    Refused { existing: ObjectId },
    /// The name is not a namespaced schema name.
    Skipped,
}

impl RegisterOutcome {
    /// Returns `true` if the name now maps to the requested schema.
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered | Self::AlreadyRegistered)
    }
}

/// Schema registry for one principal.
pub struct Registry {
    store: Arc<dyn CoStore>,
    account: ObjectId,
    group: Option<ObjectId>,
    state: Arc<RegistryState>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("account", &self.account)
            .field("group", &self.group)
            .field("root", &self.state.root())
            .finish()
    }
}

impl Registry {
    /// Registry for `account`. Registry objects are created in `group`.
    pub fn new(
        store: Arc<dyn CoStore>,
        account: ObjectId,
        group: Option<ObjectId>,
        state: Arc<RegistryState>,
    ) -> Self {
        state.mark_internal(account);
        if let Some(group) = group {
            state.mark_internal(group);
        }
        Self {
            store,
            account,
            group,
            state,
        }
    }

    pub fn store(&self) -> &Arc<dyn CoStore> {
        &self.store
    }

    pub fn state(&self) -> &Arc<RegistryState> {
        &self.state
    }

    pub fn account(&self) -> ObjectId {
        self.account
    }

    pub fn group(&self) -> Option<ObjectId> {
        self.group
    }

    /// Create a registry/index object, recording it as internal first.
    pub fn create_internal(
        &self,
        kind: ObjectKind,
        ty: &str,
        init: Option<Content>,
    ) -> RegistryResult<ObjectId> {
        let header = Header::new(kind, self.group, meta([(TYPE_KEY, json!(ty))]));
        let id = header.compute_id()?;
        self.state.mark_internal(id);
        self.store.create_with_header(header, init)?;
        debug!(object = %id.short_hex(), object_type = ty, "created internal object");
        Ok(id)
    }

    // ---------------------------------------------------------------
    // Root
    // ---------------------------------------------------------------

    /// The cached root, if it and its children are loaded. Never creates or
    /// loads anything.
    pub fn loaded_root(&self) -> Option<RegistryRoot> {
        self.state
            .root()
            .filter(|root| root.is_available(self.store.as_ref()))
    }

    /// Get or create the registry root.
    ///
    /// Returns `Ok(None)` when a root (or one of its children) is referenced
    /// but not loaded locally, or when the account itself is unavailable.
    /// Such references are never replaced.
    pub fn ensure_root(&self) -> RegistryResult<Option<RegistryRoot>> {
        if let Some(root) = self.loaded_root() {
            return Ok(Some(root));
        }
        let _guard = self.state.creation_lock();
        if let Some(root) = self.loaded_root() {
            return Ok(Some(root));
        }

        let Some(account) = self.store.content(&self.account)? else {
            warn!(account = %self.account.short_hex(), "account not available, registry root unknown");
            return Ok(None);
        };
        let root = match ChildRef::of(self.store.as_ref(), &account, REGISTRY_KEY) {
            ChildRef::Available(id) => self.load_root(id)?,
            ChildRef::Absent => Some(self.create_root()?),
            ChildRef::Unavailable(id) => {
                warn!(root = %id.short_hex(), "registry root exists but is not loaded; not replacing it");
                None
            }
        };
        if let Some(root) = root {
            self.state.set_root(root);
        }
        Ok(root)
    }

    fn create_root(&self) -> RegistryResult<RegistryRoot> {
        let schemas = self.create_internal(ObjectKind::Map, object_type::SCHEMA_REGISTRY, None)?;
        let indexes = self.create_internal(ObjectKind::Map, object_type::INDEX_MAP, None)?;
        let unclassified = self.create_internal(ObjectKind::List, object_type::INDEX_LIST, None)?;
        let manifest = self.create_internal(ObjectKind::List, object_type::SEED_MANIFEST, None)?;
        let removed = self.create_internal(ObjectKind::Map, object_type::REMOVED_SET, None)?;

        let init = Content::from_json(
            ObjectKind::Map,
            json!({
                SCHEMAS_KEY: schemas.to_string(),
                INDEXES_KEY: indexes.to_string(),
                UNCLASSIFIED_KEY: unclassified.to_string(),
                MANIFEST_KEY: manifest.to_string(),
                REMOVED_KEY: removed.to_string(),
            }),
        )?;
        let id = self.create_internal(ObjectKind::Map, object_type::REGISTRY_ROOT, Some(init))?;
        self.store
            .map_set(&self.account, REGISTRY_KEY, json!(id.to_string()))?;

        info!(root = %id.short_hex(), account = %self.account.short_hex(), "created registry root");
        Ok(RegistryRoot {
            id,
            schemas,
            indexes,
            unclassified,
            manifest,
            removed,
        })
    }

    fn load_root(&self, id: ObjectId) -> RegistryResult<Option<RegistryRoot>> {
        self.state.mark_internal(id);
        let content = self.store.content(&id)?.ok_or(StoreError::NotFound(id))?;
        let schemas = self.root_child(id, &content, SCHEMAS_KEY, ObjectKind::Map, object_type::SCHEMA_REGISTRY)?;
        let indexes = self.root_child(id, &content, INDEXES_KEY, ObjectKind::Map, object_type::INDEX_MAP)?;
        let unclassified = self.root_child(id, &content, UNCLASSIFIED_KEY, ObjectKind::List, object_type::INDEX_LIST)?;
        let manifest = self.root_child(id, &content, MANIFEST_KEY, ObjectKind::List, object_type::SEED_MANIFEST)?;
        let removed = self.root_child(id, &content, REMOVED_KEY, ObjectKind::Map, object_type::REMOVED_SET)?;

        match (schemas, indexes, unclassified, manifest, removed) {
            (Some(schemas), Some(indexes), Some(unclassified), Some(manifest), Some(removed)) => {
                debug!(root = %id.short_hex(), "loaded registry root");
                Ok(Some(RegistryRoot {
                    id,
                    schemas,
                    indexes,
                    unclassified,
                    manifest,
                    removed,
                }))
            }
            _ => Ok(None),
        }
    }

    fn root_child(
        &self,
        root: ObjectId,
        content: &Content,
        key: &str,
        kind: ObjectKind,
        ty: &str,
    ) -> RegistryResult<Option<ObjectId>> {
        match ChildRef::of(self.store.as_ref(), content, key) {
            ChildRef::Available(id) => {
                self.state.mark_internal(id);
                Ok(Some(id))
            }
            ChildRef::Unavailable(id) => {
                self.state.mark_internal(id);
                warn!(root = %root.short_hex(), key, child = %id.short_hex(), "registry child not loaded; not replacing it");
                Ok(None)
            }
            ChildRef::Absent => {
                let id = self.create_internal(kind, ty, None)?;
                self.store.map_set(&root, key, json!(id.to_string()))?;
                Ok(Some(id))
            }
        }
    }

    fn require_root(&self) -> RegistryResult<RegistryRoot> {
        self.ensure_root()?.ok_or(RegistryError::RootUnavailable)
    }

    // ---------------------------------------------------------------
    // Registration
    // ---------------------------------------------------------------

    /// Map `name` to the schema object `id`.
    pub fn register_name(&self, name: &str, id: ObjectId) -> RegistryResult<RegisterOutcome> {
        if !SchemaName::is_valid(name) {
            debug!(name, "not a namespaced schema name; skipping registration");
            return Ok(RegisterOutcome::Skipped);
        }
        let root = self.require_root()?;

        let _guard = self.state.creation_lock();
        let schemas = self
            .store
            .content(&root.schemas)?
            .ok_or(RegistryError::RootUnavailable)?;
        let outcome = match schemas.get(name) {
            Some(value) => {
                let existing = value
                    .as_str()
                    .and_then(|s| ObjectId::parse(s).ok())
                    .unwrap_or_else(ObjectId::null);
                if existing == id {
                    RegisterOutcome::AlreadyRegistered
                } else {
                    warn!(
                        name,
                        existing = %existing.short_hex(),
                        refused = %id.short_hex(),
                        "schema name already registered to another object; refusing"
                    );
                    RegisterOutcome::Refused { existing }
                }
            }
            None => {
                self.store.map_set(&root.schemas, name, json!(id.to_string()))?;
                info!(name, schema = %id.short_hex(), "registered schema");
                RegisterOutcome::Registered
            }
        };

        if outcome.is_registered() && name == META_SCHEMA_NAME {
            self.state.set_meta_schema_id(id);
        }
        Ok(outcome)
    }

    /// Register a stored schema object under the name in its content.
    pub fn register(&self, schema_id: &ObjectId) -> RegistryResult<RegisterOutcome> {
        let content = self
            .store
            .content(schema_id)?
            .ok_or(StoreError::NotFound(*schema_id))?;
        match content.get_str("name") {
            Some(name) => self.register_name(name, *schema_id),
            None => {
                debug!(schema = %schema_id.short_hex(), "schema object has no name; skipping registration");
                Ok(RegisterOutcome::Skipped)
            }
        }
    }

    /// Object ID registered under `name`.
    pub fn resolve(&self, name: &str) -> RegistryResult<Option<ObjectId>> {
        let Some(root) = self.ensure_root()? else {
            return Ok(None);
        };
        Ok(self
            .store
            .content(&root.schemas)?
            .and_then(|schemas| schemas.get_id(name)))
    }

    /// The full name -> schema ID map.
    pub fn schemas(&self) -> RegistryResult<BTreeMap<String, ObjectId>> {
        let root = self.require_root()?;
        let content = self
            .store
            .content(&root.schemas)?
            .ok_or(RegistryError::RootUnavailable)?;
        Ok(content
            .keys()
            .into_iter()
            .filter_map(|name| content.get_id(name).map(|id| (name.to_string(), id)))
            .collect())
    }

    /// ID of the meta-schema, once registered.
    pub fn meta_schema_id(&self) -> RegistryResult<Option<ObjectId>> {
        if let Some(id) = self.state.meta_schema_id() {
            return Ok(Some(id));
        }
        let id = self.resolve(META_SCHEMA_NAME)?;
        if let Some(id) = id {
            self.state.set_meta_schema_id(id);
        }
        Ok(id)
    }

    /// Returns `true` once the account has a registry root with the
    /// meta-schema registered. A root that is referenced but not loaded
    /// counts as bootstrapped. Never creates a root.
    pub fn is_bootstrapped(&self) -> RegistryResult<bool> {
        if self.loaded_root().is_none() {
            let Some(account) = self.store.content(&self.account)? else {
                return Ok(false);
            };
            if ChildRef::of(self.store.as_ref(), &account, REGISTRY_KEY) == ChildRef::Absent {
                return Ok(false);
            }
        }
        match self.ensure_root()? {
            Some(_) => Ok(self.meta_schema_id()?.is_some()),
            None => Ok(true),
        }
    }

    /// Load a stored schema. `None` if the object is not available locally.
    pub fn load_schema(&self, id: &ObjectId) -> RegistryResult<Option<SchemaDefinition>> {
        let Some(header) = self.store.header(id)? else {
            return Ok(None);
        };
        if header.object_type() != Some(object_type::SCHEMA) {
            return Err(RegistryError::NotASchema(*id));
        }
        let Some(content) = self.store.content(id)? else {
            return Ok(None);
        };
        Ok(Some(SchemaDefinition::from_content(&content)?))
    }

    // ---------------------------------------------------------------
    // Index map
    // ---------------------------------------------------------------

    /// What the index map holds for `schema_id`.
    pub fn index_ref(&self, root: &RegistryRoot, schema_id: &ObjectId) -> RegistryResult<ChildRef> {
        let content = self
            .store
            .content(&root.indexes)?
            .ok_or(RegistryError::RootUnavailable)?;
        Ok(ChildRef::of(self.store.as_ref(), &content, &schema_id.to_string()))
    }

    /// Every schema ID -> index list ID pair.
    pub fn indexes(&self) -> RegistryResult<BTreeMap<ObjectId, ObjectId>> {
        let root = self.require_root()?;
        let content = self
            .store
            .content(&root.indexes)?
            .ok_or(RegistryError::RootUnavailable)?;
        Ok(content
            .keys()
            .into_iter()
            .filter_map(|key| {
                let schema = ObjectId::parse(key).ok()?;
                content.get_id(key).map(|list| (schema, list))
            })
            .collect())
    }

    // ---------------------------------------------------------------
    // Removed objects
    // ---------------------------------------------------------------

    /// Record that `id` was deleted. Returns `false` if it already was.
    pub fn mark_removed(&self, id: &ObjectId) -> RegistryResult<bool> {
        let root = self.require_root()?;
        if self.removed_in(&root, id)? {
            return Ok(false);
        }
        self.store.map_set(
            &root.removed,
            &id.to_string(),
            json!(chrono::Utc::now().to_rfc3339()),
        )?;
        debug!(object = %id.short_hex(), "marked removed");
        Ok(true)
    }

    /// Whether `id` was deleted. Deleted objects stay out of every index.
    pub fn is_removed(&self, id: &ObjectId) -> RegistryResult<bool> {
        let root = self.require_root()?;
        self.removed_in(&root, id)
    }

    fn removed_in(&self, root: &RegistryRoot, id: &ObjectId) -> RegistryResult<bool> {
        Ok(self
            .store
            .content(&root.removed)?
            .is_some_and(|c| c.get(&id.to_string()).is_some()))
    }

    // ---------------------------------------------------------------
    // Seed manifest
    // ---------------------------------------------------------------

    /// Instance IDs recorded by the last seed.
    pub fn manifest(&self) -> RegistryResult<Vec<ObjectId>> {
        let root = self.require_root()?;
        Ok(self
            .store
            .content(&root.manifest)?
            .map(|c| c.id_items())
            .unwrap_or_default())
    }

    /// Append IDs to the seed manifest.
    pub fn record_manifest(&self, ids: &[ObjectId]) -> RegistryResult<()> {
        let root = self.require_root()?;
        for id in ids {
            self.store.list_append(&root.manifest, json!(id.to_string()))?;
        }
        Ok(())
    }

    /// Empty the seed manifest.
    pub fn clear_manifest(&self) -> RegistryResult<()> {
        let root = self.require_root()?;
        let len = self.store.content(&root.manifest)?.map_or(0, |c| c.len());
        for index in (0..len).rev() {
            self.store.list_delete_at(&root.manifest, index)?;
        }
        Ok(())
    }
}
