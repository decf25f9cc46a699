use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use cairn_registry::{ChildRef, Registry, RegistryRoot};
use cairn_store::{object_type, CoStore};
use cairn_types::{ObjectId, ObjectKind, SchemaName};

use crate::classify::Classification;
use crate::config::IndexConfig;
use crate::error::{IndexError, IndexResult};
use crate::state::IndexState;

/// Result of an indexing attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IndexOutcome {
    /// Appended to its schema's index list.
    Indexed { list: ObjectId },
    /// Already present in its schema's index list.
    AlreadyIndexed,
    /// Appended to the unclassified list.
    Unclassified,
    /// Already present in the unclassified list.
    AlreadyUnclassified,
    /// Internal, unavailable, or of a schema without indexing.
    Skipped,
    /// Deleted earlier; stays out of every index.
    Removed,
    /// Another attempt for the same object is in progress.
    InFlight,
    /// A schema object; registered instead of indexed.
    SchemaRegistered,
}

/// Maintains per-schema index lists and the unclassified list.
pub struct IndexManager {
    registry: Arc<Registry>,
    state: Arc<IndexState>,
    config: IndexConfig,
}

impl std::fmt::Debug for IndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("in_flight", &self.state.in_flight_count())
            .field("config", &self.config)
            .finish()
    }
}

impl IndexManager {
    pub fn new(registry: Arc<Registry>, state: Arc<IndexState>, config: IndexConfig) -> Self {
        Self {
            registry,
            state,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn state(&self) -> &Arc<IndexState> {
        &self.state
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &dyn CoStore {
        self.registry.store().as_ref()
    }

    // ---------------------------------------------------------------
    // Classification
    // ---------------------------------------------------------------

    /// Decide where `id` belongs. The object must be available locally.
    pub fn classify(&self, id: &ObjectId) -> IndexResult<Classification> {
        if self.registry.state().is_internal(id) {
            return Ok(Classification::Internal);
        }
        let header = self
            .store()
            .header(id)?
            .ok_or(IndexError::NotAvailable(*id))?;
        if header.is_internal() {
            return Ok(Classification::Internal);
        }
        if header.object_type() == Some(object_type::SCHEMA) {
            return Ok(Classification::Schema);
        }
        let Some(reference) = header.schema_ref() else {
            return Ok(Classification::Unclassified);
        };

        let schema = self.resolve_schema_ref(id, reference)?;
        let definition = self
            .registry
            .load_schema(&schema)?
            .ok_or(IndexError::SchemaUnavailable { object: *id, schema })?;
        Ok(if definition.indexing {
            Classification::Indexed { schema }
        } else {
            Classification::Unindexed { schema }
        })
    }

    fn resolve_schema_ref(&self, object: &ObjectId, reference: &str) -> IndexResult<ObjectId> {
        if let Ok(id) = ObjectId::parse(reference) {
            return Ok(id);
        }
        let unknown = || IndexError::UnknownSchema {
            object: *object,
            reference: reference.to_string(),
        };
        if !SchemaName::is_valid(reference) {
            return Err(unknown());
        }
        self.registry.resolve(reference)?.ok_or_else(unknown)
    }

    // ---------------------------------------------------------------
    // Index lists
    // ---------------------------------------------------------------

    /// Get or create the index list of `schema_id`.
    ///
    /// `None` when the schema has indexing disabled, or when its list is
    /// referenced but not loaded locally (never replaced).
    pub fn ensure_index_list(&self, schema_id: &ObjectId) -> IndexResult<Option<ObjectId>> {
        let root = self.require_root()?;
        let definition = self
            .registry
            .load_schema(schema_id)?
            .ok_or(IndexError::NotAvailable(*schema_id))?;
        if !definition.indexing {
            return Ok(None);
        }

        let _guard = self.registry.state().creation_lock();
        match self.registry.index_ref(&root, schema_id)? {
            ChildRef::Available(list) => Ok(Some(list)),
            ChildRef::Unavailable(list) => {
                warn!(
                    schema = %schema_id.short_hex(),
                    list = %list.short_hex(),
                    "index list exists but is not loaded; not replacing it"
                );
                Ok(None)
            }
            ChildRef::Absent => {
                let list =
                    self.registry
                        .create_internal(ObjectKind::List, object_type::INDEX_LIST, None)?;
                self.store()
                    .map_set(&root.indexes, &schema_id.to_string(), json!(list.to_string()))?;
                info!(
                    schema = %definition.name,
                    list = %list.short_hex(),
                    "created index list"
                );
                Ok(Some(list))
            }
        }
    }

    /// The index list of `schema_id`, without creating it.
    pub fn index_list(&self, schema_id: &ObjectId) -> IndexResult<Option<ObjectId>> {
        let root = self.require_root()?;
        Ok(match self.registry.index_ref(&root, schema_id)? {
            ChildRef::Available(list) => Some(list),
            _ => None,
        })
    }

    fn require_root(&self) -> IndexResult<RegistryRoot> {
        self.registry
            .ensure_root()?
            .ok_or(IndexError::RootUnavailable)
    }

    // ---------------------------------------------------------------
    // Indexing
    // ---------------------------------------------------------------

    /// Index `id` if it is not already being indexed. Idempotent.
    pub fn index_object(&self, id: &ObjectId) -> IndexResult<IndexOutcome> {
        let Some(_guard) = self.state.try_claim(*id) else {
            debug!(object = %id.short_hex(), "indexing already in flight");
            return Ok(IndexOutcome::InFlight);
        };
        self.index_claimed(id)
    }

    /// Index `id`; the caller holds its in-flight slot.
    pub(crate) fn index_claimed(&self, id: &ObjectId) -> IndexResult<IndexOutcome> {
        if !self.store().is_available(id) {
            debug!(object = %id.short_hex(), "object not available; skipping indexing");
            return Ok(IndexOutcome::Skipped);
        }
        let outcome = match self.classify(id)? {
            Classification::Internal | Classification::Unindexed { .. } => IndexOutcome::Skipped,
            Classification::Schema => {
                if self.config.auto_register_schemas {
                    let registered = self.registry.register(id)?;
                    debug!(schema = %id.short_hex(), ?registered, "schema classified");
                }
                IndexOutcome::SchemaRegistered
            }
            Classification::Unclassified | Classification::Indexed { .. }
                if self.registry.is_removed(id)? =>
            {
                IndexOutcome::Removed
            }
            Classification::Unclassified => {
                let root = self.require_root()?;
                if self.append_unique(&root.unclassified, id)? {
                    IndexOutcome::Unclassified
                } else {
                    IndexOutcome::AlreadyUnclassified
                }
            }
            Classification::Indexed { schema } => {
                let root = self.require_root()?;
                let list = match self.ensure_index_list(&schema)? {
                    Some(list) => list,
                    None => {
                        let list = match self.registry.index_ref(&root, &schema)? {
                            ChildRef::Unavailable(list) => list,
                            _ => ObjectId::null(),
                        };
                        return Err(IndexError::IndexUnavailable { schema, list });
                    }
                };
                let added = self.append_unique(&list, id)?;
                self.remove_value(&root.unclassified, id)?;
                if added {
                    IndexOutcome::Indexed { list }
                } else {
                    IndexOutcome::AlreadyIndexed
                }
            }
        };
        debug!(object = %id.short_hex(), ?outcome, "indexed object");
        Ok(outcome)
    }

    /// Index `id`, first waiting out any in-flight attempt.
    pub async fn ensure_indexed(&self, id: &ObjectId) -> IndexResult<IndexOutcome> {
        if self.state.is_in_flight(id)
            && !self
                .state
                .wait_released(id, self.config.availability_timeout())
                .await
        {
            return Ok(IndexOutcome::InFlight);
        }
        self.index_object(id)
    }

    /// Remove `id` from its index for good, first waiting out any in-flight
    /// attempt so a pending task cannot add it back afterwards.
    pub async fn retire(&self, id: &ObjectId, schema_id: Option<ObjectId>) -> IndexResult<usize> {
        let Some(_guard) = self
            .state
            .claim(*id, self.config.availability_timeout())
            .await
        else {
            return Err(IndexError::Busy(*id));
        };
        self.remove_from_index(id, schema_id)
    }

    /// Remove `id` from its index and record the removal, so that neither
    /// later writes nor reconciliation index it again. The schema is read
    /// from the header when not given; objects with no schema are removed
    /// from the unclassified list. Returns the number of entries removed.
    pub fn remove_from_index(
        &self,
        id: &ObjectId,
        schema_id: Option<ObjectId>,
    ) -> IndexResult<usize> {
        let root = self.require_root()?;
        self.registry.mark_removed(id)?;
        let schema = match schema_id {
            Some(schema) => Some(schema),
            None => {
                let header = self
                    .store()
                    .header(id)?
                    .ok_or(IndexError::NotAvailable(*id))?;
                match header.schema_ref() {
                    Some(reference) => Some(self.resolve_schema_ref(id, reference)?),
                    None => None,
                }
            }
        };

        let list = match schema {
            None => root.unclassified,
            Some(schema) => match self.registry.index_ref(&root, &schema)? {
                ChildRef::Available(list) => list,
                ChildRef::Absent => return Ok(0),
                ChildRef::Unavailable(list) => {
                    return Err(IndexError::IndexUnavailable { schema, list })
                }
            },
        };
        let removed = self.remove_value(&list, id)?;
        debug!(object = %id.short_hex(), list = %list.short_hex(), removed, "removed from index");
        Ok(removed)
    }

    /// IDs in the index list of `schema_id`.
    pub fn members(&self, schema_id: &ObjectId) -> IndexResult<Vec<ObjectId>> {
        match self.index_list(schema_id)? {
            Some(list) => self.list_ids(&list),
            None => Ok(Vec::new()),
        }
    }

    /// IDs in the unclassified list.
    pub fn unclassified_members(&self) -> IndexResult<Vec<ObjectId>> {
        let root = self.require_root()?;
        self.list_ids(&root.unclassified)
    }

    fn list_ids(&self, list: &ObjectId) -> IndexResult<Vec<ObjectId>> {
        Ok(self
            .store()
            .content(list)?
            .map(|c| c.id_items())
            .unwrap_or_default())
    }

    /// Append `id` to `list` unless present. Lists stay small (one schema's
    /// instances), so a linear scan is fine.
    fn append_unique(&self, list: &ObjectId, id: &ObjectId) -> IndexResult<bool> {
        let value = json!(id.to_string());
        let content = self
            .store()
            .content(list)?
            .ok_or(IndexError::NotAvailable(*list))?;
        if content.contains_item(&value) {
            return Ok(false);
        }
        self.store().list_append(list, value)?;
        Ok(true)
    }

    fn remove_value(&self, list: &ObjectId, id: &ObjectId) -> IndexResult<usize> {
        let value = json!(id.to_string());
        let positions = self
            .store()
            .content(list)?
            .map(|c| c.positions_of(&value))
            .unwrap_or_default();
        for position in positions.iter().rev() {
            self.store().list_delete_at(list, *position)?;
        }
        Ok(positions.len())
    }
}
