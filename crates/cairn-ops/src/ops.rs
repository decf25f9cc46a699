use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use cairn_index::{IndexError, IndexManager};
use cairn_schema::{SchemaDefinition, SchemaError, ValidationMode};
use cairn_store::{meta, CoStore, Content, Header, Op, SCHEMA_KEY};
use cairn_types::{ObjectId, ObjectKind, SchemaName};

use crate::config::OpsConfig;
use crate::error::{OpsError, OpsResult};
use crate::expr::Evaluator;
use crate::live::{LiveValue, ReadTarget};

/// How `create` treats symbolic schema names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchemaResolution {
    /// Only object IDs are accepted.
    #[default]
    Strict,
    /// Registered names are resolved through the registry.
    Seeding,
}

/// Result of [`Operations::create`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Created {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub schema: ObjectId,
    pub created_at: DateTime<Utc>,
}

/// Result of [`Operations::update`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Updated {
    pub id: ObjectId,
    /// Fields written, with their evaluated values.
    pub delta: BTreeMap<String, Value>,
}

/// Result of [`Operations::delete`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Deleted {
    pub id: ObjectId,
    /// Index entries removed.
    pub removed: usize,
}

/// Result of [`Operations::append`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AppendOutcome {
    /// Items written.
    pub applied: usize,
    /// Duplicates left out; `None` for logs.
    pub skipped: Option<usize>,
}

/// Schema-aware CRUD over the object store.
pub struct Operations {
    indexer: Arc<IndexManager>,
    evaluator: Arc<dyn Evaluator>,
    config: OpsConfig,
    resolution: SchemaResolution,
}

impl std::fmt::Debug for Operations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operations")
            .field("config", &self.config)
            .field("resolution", &self.resolution)
            .finish()
    }
}

impl Operations {
    /// Runtime operations: schema references must be object IDs.
    pub fn new(indexer: Arc<IndexManager>, evaluator: Arc<dyn Evaluator>, config: OpsConfig) -> Self {
        Self {
            indexer,
            evaluator,
            config,
            resolution: SchemaResolution::Strict,
        }
    }

    /// Operations for the seeding pipeline, which may name schemas.
    pub fn for_seeding(
        indexer: Arc<IndexManager>,
        evaluator: Arc<dyn Evaluator>,
        config: OpsConfig,
    ) -> Self {
        Self {
            resolution: SchemaResolution::Seeding,
            ..Self::new(indexer, evaluator, config)
        }
    }

    pub fn indexer(&self) -> &Arc<IndexManager> {
        &self.indexer
    }

    pub fn resolution(&self) -> SchemaResolution {
        self.resolution
    }

    fn store(&self) -> &Arc<dyn CoStore> {
        self.indexer.registry().store()
    }

    // ---------------------------------------------------------------
    // Schema resolution
    // ---------------------------------------------------------------

    /// Resolve a caller-supplied schema reference under this instance's
    /// [`SchemaResolution`].
    pub fn resolve_schema(&self, reference: &str) -> OpsResult<ObjectId> {
        if ObjectId::looks_like(reference) {
            return ObjectId::parse(reference)
                .map_err(|_| OpsError::InvalidSchemaRef(reference.to_string()));
        }
        if !SchemaName::is_valid(reference) {
            return Err(OpsError::InvalidSchemaRef(reference.to_string()));
        }
        match self.resolution {
            SchemaResolution::Strict => Err(OpsError::SymbolicSchemaRef(reference.to_string())),
            SchemaResolution::Seeding => self.lookup_name(reference),
        }
    }

    /// Resolve the schema reference found in an object header. Headers may
    /// carry registered names regardless of the resolution mode.
    fn header_schema(&self, id: &ObjectId, header: &Header) -> OpsResult<Option<ObjectId>> {
        let Some(reference) = header.schema_ref() else {
            return Ok(None);
        };
        if let Ok(schema) = ObjectId::parse(reference) {
            return Ok(Some(schema));
        }
        if SchemaName::is_valid(reference) {
            return self.lookup_name(reference).map(Some);
        }
        Err(OpsError::Index(IndexError::UnknownSchema {
            object: *id,
            reference: reference.to_string(),
        }))
    }

    fn lookup_name(&self, name: &str) -> OpsResult<ObjectId> {
        self.indexer
            .registry()
            .resolve(name)?
            .ok_or_else(|| OpsError::SchemaNotFound(name.to_string()))
    }

    fn load_definition(&self, schema: &ObjectId) -> OpsResult<SchemaDefinition> {
        self.indexer
            .registry()
            .load_schema(schema)?
            .ok_or_else(|| OpsError::SchemaNotFound(schema.to_string()))
    }

    fn require_header(&self, id: &ObjectId) -> OpsResult<Header> {
        self.store().header(id)?.ok_or(OpsError::NotFound(*id))
    }

    fn rejected(op: &'static str, definition: &SchemaDefinition, source: SchemaError) -> OpsError {
        OpsError::Validation {
            op,
            schema: definition.name.to_string(),
            source,
        }
    }

    async fn wait_durable(&self, id: &ObjectId) -> OpsResult<()> {
        match tokio::time::timeout(
            self.config.durability_timeout(),
            self.store().wait_for_durable(id),
        )
        .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(OpsError::DurabilityTimeout(*id)),
        }
    }

    // ---------------------------------------------------------------
    // CRUD
    // ---------------------------------------------------------------

    /// Validate `data` in full against the referenced schema and create an
    /// object of the schema's kind.
    pub async fn create(&self, schema_ref: &str, data: Value) -> OpsResult<Created> {
        self.create_with_mode(schema_ref, data, ValidationMode::Full)
            .await
    }

    /// [`create`](Self::create) with an explicit validation mode. Seeding
    /// creates bare objects in [`ValidationMode::Partial`] and completes
    /// them with a validated update.
    pub async fn create_with_mode(
        &self,
        schema_ref: &str,
        data: Value,
        mode: ValidationMode,
    ) -> OpsResult<Created> {
        let schema = self.resolve_schema(schema_ref)?;
        let definition = self.load_definition(&schema)?;
        definition
            .validate_data(&data, mode)
            .map_err(|e| Self::rejected("create", &definition, e))?;

        let content = Content::from_json(definition.kind, data)?;
        let handle = self.store().create_object(
            definition.kind,
            self.indexer.registry().group(),
            Some(content),
            meta([(SCHEMA_KEY, json!(schema.to_string()))]),
        )?;
        self.wait_durable(&handle.id).await?;

        debug!(
            object = %handle.id.short_hex(),
            schema = %definition.name,
            kind = %definition.kind,
            "created object"
        );
        Ok(Created {
            id: handle.id,
            kind: handle.kind,
            schema,
            created_at: handle.header.created_at,
        })
    }

    /// Subscribe to an object, a schema's index, or the unclassified list.
    pub fn read(&self, target: ReadTarget) -> OpsResult<LiveValue> {
        let id = match target {
            ReadTarget::Object(id) => id,
            ReadTarget::Schema(schema) => self
                .indexer
                .ensure_index_list(&schema)?
                .ok_or(OpsError::NotIndexed(schema))?,
            ReadTarget::Unclassified => {
                self.indexer
                    .registry()
                    .ensure_root()?
                    .ok_or(OpsError::Index(IndexError::RootUnavailable))?
                    .unclassified
            }
        };
        Ok(LiveValue::new(id, self.store().subscribe(&id)))
    }

    /// Evaluate `partial` against the current content, validate the merged
    /// object in full, and write the evaluated fields in one message.
    pub async fn update(&self, id: &ObjectId, partial: Value) -> OpsResult<Updated> {
        let Value::Object(partial) = partial else {
            return Err(OpsError::InvalidInput(
                "update data must be an object".to_string(),
            ));
        };
        if partial.contains_key(SCHEMA_KEY) {
            return Err(OpsError::SchemaHintRejected);
        }

        let header = self.require_header(id)?;
        if header.kind != ObjectKind::Map {
            return Err(OpsError::KindMismatch {
                id: *id,
                expected: ObjectKind::Map,
                actual: header.kind,
            });
        }
        let schema = self.header_schema(id, &header)?.ok_or(OpsError::NoSchema(*id))?;
        let definition = self.load_definition(&schema)?;
        let current = self
            .store()
            .content(id)?
            .ok_or(OpsError::NotFound(*id))?
            .to_json();

        let ctx = json!({ "existing": current });
        let mut delta = BTreeMap::new();
        for (key, expr) in &partial {
            delta.insert(key.clone(), self.evaluator.evaluate(expr, &ctx)?);
        }

        let mut merged = match current {
            Value::Object(map) => map,
            _ => Default::default(),
        };
        for (key, value) in &delta {
            merged.insert(key.clone(), value.clone());
        }
        definition
            .validate_data(&Value::Object(merged), ValidationMode::Full)
            .map_err(|e| Self::rejected("update", &definition, e))?;

        let ops: Vec<Op> = delta
            .iter()
            .map(|(key, value)| Op::Set {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();
        if !ops.is_empty() {
            self.store().apply_ops(id, ops)?;
            self.wait_durable(id).await?;
        }
        debug!(object = %id.short_hex(), fields = delta.len(), "updated object");
        Ok(Updated { id: *id, delta })
    }

    /// Remove `id` from its index. The object itself is left intact, but
    /// later writes to it no longer index it. Indexing already in flight for
    /// `id` finishes first.
    pub async fn delete(&self, id: &ObjectId) -> OpsResult<Deleted> {
        let header = self.require_header(id)?;
        let schema = self.header_schema(id, &header)?;
        let removed = self.indexer.retire(id, schema).await?;

        let list = match schema {
            Some(schema) => self.indexer.index_list(&schema)?,
            None => self.indexer.registry().loaded_root().map(|root| root.unclassified),
        };
        if let (Some(list), true) = (list, removed > 0) {
            self.wait_durable(&list).await?;
        }
        info!(object = %id.short_hex(), removed, "deleted object");
        Ok(Deleted { id: *id, removed })
    }

    /// Append `items` to a list or log.
    ///
    /// The target kind is `kind` when given, else the schema's declared kind,
    /// else the object's own kind; it must match the object. Lists skip items
    /// already present (in the list or earlier in `items`); logs take all.
    pub async fn append(
        &self,
        id: &ObjectId,
        items: Vec<Value>,
        kind: Option<ObjectKind>,
    ) -> OpsResult<AppendOutcome> {
        let header = self.require_header(id)?;
        let definition = match self.header_schema(id, &header)? {
            Some(schema) => Some(self.load_definition(&schema)?),
            None => None,
        };
        let target = kind
            .or(definition.as_ref().map(|d| d.kind))
            .unwrap_or(header.kind);
        if target == ObjectKind::Map || target != header.kind {
            return Err(OpsError::KindMismatch {
                id: *id,
                expected: if target == ObjectKind::Map { ObjectKind::List } else { target },
                actual: header.kind,
            });
        }

        if let Some(definition) = &definition {
            for item in &items {
                definition
                    .validate_item(item)
                    .map_err(|e| Self::rejected("append", definition, e))?;
            }
        }

        let (ops, skipped) = match target {
            ObjectKind::List => {
                let current = self.store().content(id)?.ok_or(OpsError::NotFound(*id))?;
                let mut seen: Vec<Value> = current.items().to_vec();
                let mut ops = Vec::new();
                let mut skipped = 0;
                for item in items {
                    if seen.contains(&item) {
                        skipped += 1;
                        continue;
                    }
                    seen.push(item.clone());
                    ops.push(Op::Append { value: item });
                }
                (ops, Some(skipped))
            }
            _ => (
                items.into_iter().map(|value| Op::Push { value }).collect(),
                None,
            ),
        };

        let applied = ops.len();
        if applied > 0 {
            self.store().apply_ops(id, ops)?;
            self.wait_durable(id).await?;
        }
        debug!(object = %id.short_hex(), applied, ?skipped, "appended items");
        Ok(AppendOutcome { applied, skipped })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::BasicEvaluator;
    use cairn_index::{IndexConfig, IndexState, IndexingHook};
    use cairn_registry::{Registry, RegistryState};
    use cairn_store::{create_account, object_type, InMemoryCoStore, TYPE_KEY};

    struct Fixture {
        store: Arc<InMemoryCoStore>,
        hook: Arc<IndexingHook>,
        ops: Operations,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryCoStore::new());
        let account = create_account(store.as_ref(), "alice").unwrap();
        let registry = Arc::new(Registry::new(
            store.clone(),
            account,
            None,
            Arc::new(RegistryState::new()),
        ));
        registry.ensure_root().unwrap().unwrap();
        let manager = Arc::new(IndexManager::new(
            registry,
            Arc::new(IndexState::new()),
            IndexConfig::default(),
        ));
        let hook = IndexingHook::install(&manager);
        let ops = Operations::new(manager, Arc::new(BasicEvaluator), OpsConfig::default());
        Fixture { store, hook, ops }
    }

    fn schema(fx: &Fixture, definition: Value) -> ObjectId {
        let definition = SchemaDefinition::from_json(&definition).unwrap();
        let init = Content::from_json(ObjectKind::Map, definition.to_stored_json("@self")).unwrap();
        let id = fx
            .store
            .create_object(
                ObjectKind::Map,
                None,
                Some(init),
                meta([(TYPE_KEY, json!(object_type::SCHEMA))]),
            )
            .unwrap()
            .id;
        fx.ops.indexer().registry().register(&id).unwrap();
        id
    }

    fn task_schema(fx: &Fixture) -> ObjectId {
        schema(
            fx,
            json!({
                "name": "app/schema/task",
                "indexing": true,
                "shape": {
                    "type": "object",
                    "properties": {"title": "string", "done": "boolean", "count": "integer"},
                    "required": ["title", "done"]
                }
            }),
        )
    }

    fn list_schema(fx: &Fixture, kind: &str) -> ObjectId {
        schema(
            fx,
            json!({
                "name": format!("app/schema/{kind}-of-tags"),
                "kind": kind,
                "shape": "string"
            }),
        )
    }

    // ----------------------------------------------------------------
    // create / read
    // ----------------------------------------------------------------

    #[tokio::test]
    async fn create_validates_and_stamps_schema() {
        let fx = fixture();
        let task = task_schema(&fx);
        let created = fx
            .ops
            .create(&task.to_string(), json!({"title": "write docs", "done": false}))
            .await
            .unwrap();
        assert_eq!(created.kind, ObjectKind::Map);
        assert_eq!(created.schema, task);

        let header = fx.store.header(&created.id).unwrap().unwrap();
        assert_eq!(header.schema_ref(), Some(task.to_string().as_str()));
        assert_eq!(header.created_at, created.created_at);
    }

    #[tokio::test]
    async fn create_rejects_invalid_data_naming_op_and_schema() {
        let fx = fixture();
        let task = task_schema(&fx);
        let err = fx
            .ops
            .create(&task.to_string(), json!({"title": 3}))
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("create"), "{message}");
        assert!(message.contains("app/schema/task"), "{message}");
    }

    #[tokio::test]
    async fn partial_create_skips_required_fields() {
        let fx = fixture();
        let task = task_schema(&fx).to_string();
        assert!(fx.ops.create(&task, json!({"title": "bare"})).await.is_err());
        let created = fx
            .ops
            .create_with_mode(&task, json!({"title": "bare"}), ValidationMode::Partial)
            .await
            .unwrap();
        assert!(matches!(
            fx.ops.update(&created.id, json!({"title": "still bare"})).await,
            Err(OpsError::Validation { op: "update", .. })
        ));
        fx.ops
            .update(&created.id, json!({"done": false}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn symbolic_refs_only_while_seeding() {
        let fx = fixture();
        task_schema(&fx);
        let data = json!({"title": "t", "done": true});
        assert!(matches!(
            fx.ops.create("app/schema/task", data.clone()).await,
            Err(OpsError::SymbolicSchemaRef(_))
        ));
        assert!(matches!(
            fx.ops.create("not a ref", data.clone()).await,
            Err(OpsError::InvalidSchemaRef(_))
        ));

        let seeding = Operations::for_seeding(
            fx.ops.indexer().clone(),
            Arc::new(BasicEvaluator),
            OpsConfig::default(),
        );
        assert!(seeding.create("app/schema/task", data.clone()).await.is_ok());
        assert!(matches!(
            seeding.create("app/schema/missing", data).await,
            Err(OpsError::SchemaNotFound(_))
        ));
    }

    #[tokio::test]
    async fn read_is_a_live_subscription() {
        let fx = fixture();
        let task = task_schema(&fx);
        let created = fx
            .ops
            .create(&task.to_string(), json!({"title": "a", "done": false}))
            .await
            .unwrap();

        let mut live = fx.ops.read(ReadTarget::Object(created.id)).unwrap();
        assert_eq!(live.to_json()["title"], json!("a"));
        fx.ops
            .update(&created.id, json!({"title": "b"}))
            .await
            .unwrap();
        let next = live.changed().await.unwrap().unwrap();
        assert_eq!(next.get("title"), Some(&json!("b")));
    }

    #[tokio::test]
    async fn index_views_follow_indexing() {
        let fx = fixture();
        let task = task_schema(&fx);
        let index = fx.ops.read(ReadTarget::Schema(task)).unwrap();
        assert!(index.ids().is_empty());

        let created = fx
            .ops
            .create(&task.to_string(), json!({"title": "a", "done": false}))
            .await
            .unwrap();
        fx.hook.drain().await;
        assert_eq!(index.ids(), vec![created.id]);

        let notes = schema(&fx, json!({"name": "app/schema/note", "shape": {}}));
        assert!(matches!(
            fx.ops.read(ReadTarget::Schema(notes)),
            Err(OpsError::NotIndexed(id)) if id == notes
        ));
    }

    // ----------------------------------------------------------------
    // update
    // ----------------------------------------------------------------

    #[tokio::test]
    async fn update_toggles_and_leaves_other_fields() {
        let fx = fixture();
        let task = task_schema(&fx);
        let created = fx
            .ops
            .create(&task.to_string(), json!({"title": "a", "done": false, "count": 1}))
            .await
            .unwrap();

        for expected in [true, false, true] {
            let updated = fx
                .ops
                .update(&created.id, json!({"done": {"$not": "$existing.done"}}))
                .await
                .unwrap();
            assert_eq!(updated.delta.get("done"), Some(&json!(expected)));
            let content = fx.store.content(&created.id).unwrap().unwrap();
            assert_eq!(
                content.to_json(),
                json!({"title": "a", "done": expected, "count": 1})
            );
        }
    }

    #[tokio::test]
    async fn update_validates_merged_object() {
        let fx = fixture();
        let task = task_schema(&fx);
        let created = fx
            .ops
            .create(&task.to_string(), json!({"title": "a", "done": false}))
            .await
            .unwrap();

        // Partial data missing required fields is fine once merged.
        fx.ops
            .update(&created.id, json!({"count": 2}))
            .await
            .unwrap();
        fx.ops
            .update(&created.id, json!({"count": {"$add": ["$existing.count", 2]}}))
            .await
            .unwrap();
        let content = fx.store.content(&created.id).unwrap().unwrap();
        assert_eq!(content.get("count"), Some(&json!(4)));

        let err = fx
            .ops
            .update(&created.id, json!({"done": "yes"}))
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::Validation { op: "update", .. }));
        assert!(err.to_string().contains("app/schema/task"));
        let content = fx.store.content(&created.id).unwrap().unwrap();
        assert_eq!(content.get("done"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn update_rejects_schema_hints_and_schemaless_targets() {
        let fx = fixture();
        let task = task_schema(&fx);
        let created = fx
            .ops
            .create(&task.to_string(), json!({"title": "a", "done": false}))
            .await
            .unwrap();
        assert!(matches!(
            fx.ops
                .update(&created.id, json!({"$schema": "co_elsewhere", "done": true}))
                .await,
            Err(OpsError::SchemaHintRejected)
        ));

        let loose = fx
            .store
            .create_object(ObjectKind::Map, None, None, Default::default())
            .unwrap()
            .id;
        assert!(matches!(
            fx.ops.update(&loose, json!({"x": 1})).await,
            Err(OpsError::NoSchema(id)) if id == loose
        ));
        let missing = ObjectId::from_bytes(b"nowhere");
        assert!(matches!(
            fx.ops.update(&missing, json!({"x": 1})).await,
            Err(OpsError::NotFound(_))
        ));
    }

    // ----------------------------------------------------------------
    // delete
    // ----------------------------------------------------------------

    #[tokio::test]
    async fn delete_removes_index_membership_only() {
        let fx = fixture();
        let task = task_schema(&fx);
        let mut ids = Vec::new();
        for i in 0..3 {
            let created = fx
                .ops
                .create(&task.to_string(), json!({"title": format!("t{i}"), "done": false}))
                .await
                .unwrap();
            ids.push(created.id);
        }
        fx.hook.drain().await;
        let index = fx.ops.read(ReadTarget::Schema(task)).unwrap();
        assert_eq!(index.ids().len(), 3);

        let deleted = fx.ops.delete(&ids[1]).await.unwrap();
        assert_eq!(deleted.removed, 1);
        assert_eq!(index.ids().len(), 2);
        assert!(!index.ids().contains(&ids[1]));
        assert!(fx.store.is_available(&ids[1]));

        assert_eq!(fx.ops.delete(&ids[1]).await.unwrap().removed, 0);
        assert_eq!(index.ids().len(), 2);
    }

    #[tokio::test]
    async fn delete_waits_for_pending_indexing() {
        let fx = fixture();
        let task = task_schema(&fx);
        let created = fx
            .ops
            .create(&task.to_string(), json!({"title": "a", "done": false}))
            .await
            .unwrap();

        // No drain: the write-path task may still hold the object.
        let deleted = fx.ops.delete(&created.id).await.unwrap();
        assert_eq!(deleted.removed, 1);
        fx.hook.drain().await;
        assert!(fx.ops.indexer().members(&task).unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleted_objects_stay_out_of_the_index() {
        let fx = fixture();
        let task = task_schema(&fx);
        let mut ids = Vec::new();
        for i in 0..3 {
            let created = fx
                .ops
                .create(&task.to_string(), json!({"title": format!("t{i}"), "done": false}))
                .await
                .unwrap();
            ids.push(created.id);
        }
        fx.hook.drain().await;
        fx.ops.delete(&ids[0]).await.unwrap();

        fx.ops.update(&ids[0], json!({"done": true})).await.unwrap();
        fx.hook.drain().await;
        assert_eq!(fx.ops.indexer().members(&task).unwrap(), vec![ids[1], ids[2]]);

        let report = fx.ops.indexer().reconcile().await;
        assert_eq!(report.removed, 1);
        assert_eq!(fx.ops.indexer().members(&task).unwrap(), vec![ids[1], ids[2]]);
    }

    // ----------------------------------------------------------------
    // append
    // ----------------------------------------------------------------

    async fn collection(fx: &Fixture, kind: &str) -> ObjectId {
        let schema = list_schema(fx, kind);
        fx.ops
            .create(&schema.to_string(), json!([]))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn list_append_deduplicates() {
        let fx = fixture();
        let list = collection(&fx, "list").await;
        let outcome = fx
            .ops
            .append(&list, vec![json!("a"), json!("b"), json!("a")], None)
            .await
            .unwrap();
        assert_eq!(outcome, AppendOutcome { applied: 2, skipped: Some(1) });

        let again = fx.ops.append(&list, vec![json!("b")], None).await.unwrap();
        assert_eq!(again, AppendOutcome { applied: 0, skipped: Some(1) });
        let items = fx.store.content(&list).unwrap().unwrap().items().to_vec();
        assert_eq!(items, vec![json!("a"), json!("b")]);
    }

    #[tokio::test]
    async fn log_append_keeps_duplicates_in_order() {
        let fx = fixture();
        let log = collection(&fx, "log").await;
        let outcome = fx
            .ops
            .append(&log, vec![json!("a"), json!("b"), json!("a")], None)
            .await
            .unwrap();
        assert_eq!(outcome, AppendOutcome { applied: 3, skipped: None });
        let items = fx.store.content(&log).unwrap().unwrap().items().to_vec();
        assert_eq!(items, vec![json!("a"), json!("b"), json!("a")]);
    }

    #[tokio::test]
    async fn append_checks_kind_and_items() {
        let fx = fixture();
        let list = collection(&fx, "list").await;
        assert!(matches!(
            fx.ops.append(&list, vec![json!("a")], Some(ObjectKind::Log)).await,
            Err(OpsError::KindMismatch { expected: ObjectKind::Log, actual: ObjectKind::List, .. })
        ));
        assert!(matches!(
            fx.ops.append(&list, vec![json!("a"), json!(5)], None).await,
            Err(OpsError::Validation { op: "append", .. })
        ));
        assert!(fx.store.content(&list).unwrap().unwrap().is_empty());

        let task = task_schema(&fx);
        let map = fx
            .ops
            .create(&task.to_string(), json!({"title": "a", "done": false}))
            .await
            .unwrap();
        assert!(matches!(
            fx.ops.append(&map.id, vec![json!("x")], None).await,
            Err(OpsError::KindMismatch { .. })
        ));
    }
}
