use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use cairn_index::IndexManager;
use cairn_ops::{Evaluator, Operations, OpsConfig, OpsError, OpsResult};
use cairn_registry::{RegisterOutcome, Registry};
use cairn_schema::{meta_schema, SchemaDefinition, ValidationMode, META_SCHEMA_NAME, SELF_PLACEHOLDER};
use cairn_store::{meta, object_type, CoStore, Content, Op, StoreError, SCHEMA_KEY, TYPE_KEY};
use cairn_types::{ObjectId, ObjectKind, SchemaName};

use crate::bundle::{
    as_nested, config_ref_fields, resolve_config_refs, strip_config_refs, ConfigSpec, DataRecord,
    SeedBundle,
};
use crate::config::SeedConfig;
use crate::error::{SeedError, SeedResult};
use crate::graph::DependencyGraph;
use crate::report::{RecordFailure, RecordKind, SeedReport, SeedSummary};

/// Runs seed bundles against one store.
pub struct Seeder {
    ops: Operations,
    config: SeedConfig,
}

impl std::fmt::Debug for Seeder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Seeder")
            .field("config", &self.config)
            .finish()
    }
}

/// A bare map config waiting for its references (pass two).
struct PendingConfig<'a> {
    spec: &'a ConfigSpec,
    id: ObjectId,
}

impl Seeder {
    pub fn new(
        indexer: Arc<IndexManager>,
        evaluator: Arc<dyn Evaluator>,
        ops_config: OpsConfig,
        config: SeedConfig,
    ) -> Self {
        Self {
            ops: Operations::for_seeding(indexer, evaluator, ops_config),
            config,
        }
    }

    pub fn ops(&self) -> &Operations {
        &self.ops
    }

    fn indexer(&self) -> &Arc<IndexManager> {
        self.ops.indexer()
    }

    fn registry(&self) -> &Arc<Registry> {
        self.indexer().registry()
    }

    fn store(&self) -> &Arc<dyn CoStore> {
        self.registry().store()
    }

    /// Seed `bundle`.
    ///
    /// Skips (writing nothing) when the store is already bootstrapped,
    /// unless the bundle asks for a fresh seed. Schema failures abort;
    /// record failures abort only with
    /// [`SeedConfig::halt_on_record_error`].
    pub async fn seed(&self, bundle: &SeedBundle) -> SeedResult<SeedReport> {
        bundle.check()?;
        let force = bundle.options.force_fresh_seed;
        if !force && self.registry().is_bootstrapped()? {
            info!("registry already bootstrapped; skipping seed");
            return Ok(SeedReport::Skipped {
                reason: "registry already bootstrapped; set force_fresh_seed to reseed".into(),
            });
        }
        self.registry()
            .ensure_root()?
            .ok_or(SeedError::RootUnavailable)?;
        if force {
            self.remove_previous().await?;
        }

        let mut summary = SeedSummary::default();
        let mut created = Vec::new();

        let meta_id = self.bootstrap_meta()?;
        info!(meta = %meta_id.short_hex(), "meta-schema ready");

        summary.schemas = self.seed_schemas(&meta_id, bundle.schema_definitions()?)?;
        created.extend(summary.schemas.values().copied());
        info!(count = summary.schemas.len(), "schemas seeded");

        self.seed_configs(bundle, &mut summary, &mut created).await?;
        info!(count = summary.configs.len(), "configs seeded");

        self.seed_data(bundle, &mut summary, &mut created).await?;
        info!(
            collections = summary.data.len(),
            failures = summary.failures.len(),
            "data seeded"
        );

        summary.registry = self.registry().schemas()?;
        self.sweep(&created).await;
        Ok(SeedReport::Seeded(summary))
    }

    /// Remove the instances recorded by the previous seed from their indexes.
    async fn remove_previous(&self) -> SeedResult<()> {
        let previous = self.registry().manifest()?;
        for id in &previous {
            if let Err(e) = self.ops.delete(id).await {
                warn!(object = %id.short_hex(), error = %e, "could not remove seeded instance");
            }
        }
        self.registry().clear_manifest()?;
        info!(count = previous.len(), "removed previously seeded instances");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Schemas
    // ---------------------------------------------------------------

    /// Get or create the meta-schema. A new one is written with a
    /// placeholder self-reference, then patched to its own ID.
    fn bootstrap_meta(&self) -> SeedResult<ObjectId> {
        let definition = meta_schema();
        if let Some(id) = self.registry().meta_schema_id()? {
            self.patch_schema(&id, &definition, &id)?;
            return Ok(id);
        }

        let stored = definition.to_stored_json(SELF_PLACEHOLDER);
        definition.validate_data(&stored, ValidationMode::Full)?;
        let handle = self.store().create_object(
            ObjectKind::Map,
            self.registry().group(),
            Some(Content::from_json(ObjectKind::Map, stored)?),
            meta([(TYPE_KEY, json!(object_type::SCHEMA))]),
        )?;
        self.store()
            .map_set(&handle.id, SCHEMA_KEY, json!(handle.id.to_string()))?;

        match self.registry().register_name(META_SCHEMA_NAME, handle.id)? {
            RegisterOutcome::Refused { existing } => Ok(existing),
            _ => Ok(handle.id),
        }
    }

    /// Create or patch every bundle schema, then rewrite references to IDs.
    fn seed_schemas(
        &self,
        meta_id: &ObjectId,
        definitions: Vec<SchemaDefinition>,
    ) -> SeedResult<BTreeMap<String, ObjectId>> {
        let graph = DependencyGraph::build(&definitions);
        let mut ids: BTreeMap<SchemaName, ObjectId> = self
            .registry()
            .schemas()?
            .into_iter()
            .filter_map(|(name, id)| SchemaName::parse(&name).ok().map(|name| (name, id)))
            .collect();

        // Refuse before writing anything if the graph cannot close.
        let missing: Vec<SchemaName> = graph
            .external_references()
            .into_iter()
            .filter(|name| !ids.contains_key(name))
            .collect();
        if let Some(first) = missing.first() {
            let schema = definitions
                .iter()
                .find(|d| d.references().contains(first))
                .map(|d| d.name.to_string())
                .unwrap_or_default();
            return Err(SeedError::UnresolvedReferences {
                schema,
                missing: missing.iter().map(ToString::to_string).collect(),
            });
        }

        let mut by_name: BTreeMap<SchemaName, SchemaDefinition> = definitions
            .into_iter()
            .map(|d| (d.name.clone(), d))
            .collect();
        let order = graph.topological_order();

        for name in &order {
            let Some(definition) = by_name.get(name) else {
                continue;
            };
            if ids.contains_key(name) {
                continue;
            }
            // Dependencies are already placed unless they sit on a cycle;
            // those stay symbolic until the pass below.
            let mut partial = definition.clone();
            partial.resolve_references(&ids);
            let id = self.create_schema(&partial, meta_id)?;
            ids.insert(name.clone(), id);
        }

        let mut seeded = BTreeMap::new();
        for name in &order {
            let (Some(definition), Some(id)) = (by_name.get_mut(name), ids.get(name).copied()) else {
                continue;
            };
            let unresolved = definition.resolve_references(&ids);
            if !unresolved.is_empty() {
                return Err(SeedError::UnresolvedReferences {
                    schema: name.to_string(),
                    missing: unresolved.iter().map(ToString::to_string).collect(),
                });
            }
            self.patch_schema(&id, definition, meta_id)?;
            seeded.insert(name.to_string(), id);
        }
        Ok(seeded)
    }

    fn create_schema(&self, definition: &SchemaDefinition, meta_id: &ObjectId) -> SeedResult<ObjectId> {
        let stored = definition.to_stored_json(&meta_id.to_string());
        meta_schema().validate_data(&stored, ValidationMode::Full)?;
        let handle = self.store().create_object(
            ObjectKind::Map,
            self.registry().group(),
            Some(Content::from_json(ObjectKind::Map, stored)?),
            meta([
                (TYPE_KEY, json!(object_type::SCHEMA)),
                (SCHEMA_KEY, json!(meta_id.to_string())),
            ]),
        )?;
        match self
            .registry()
            .register_name(definition.name.as_str(), handle.id)?
        {
            RegisterOutcome::Refused { existing } => {
                warn!(
                    name = %definition.name,
                    existing = %existing.short_hex(),
                    "schema registered concurrently; using the registered object"
                );
                Ok(existing)
            }
            _ => {
                info!(name = %definition.name, schema = %handle.id.short_hex(), "created schema");
                Ok(handle.id)
            }
        }
    }

    /// Bring a stored schema in line with `definition`, keeping its ID.
    /// Writes only the fields that differ.
    fn patch_schema(
        &self,
        id: &ObjectId,
        definition: &SchemaDefinition,
        meta_id: &ObjectId,
    ) -> SeedResult<()> {
        let current = self
            .store()
            .content(id)?
            .ok_or(StoreError::NotFound(*id))?;
        if let Ok(stored) = SchemaDefinition::from_content(&current) {
            if stored.kind != definition.kind {
                return Err(SeedError::KindChanged {
                    name: definition.name.to_string(),
                    stored: stored.kind,
                    requested: definition.kind,
                });
            }
        }

        let Value::Object(target) = definition.to_stored_json(&meta_id.to_string()) else {
            return Ok(());
        };
        meta_schema().validate_data(&Value::Object(target.clone()), ValidationMode::Full)?;

        let mut ops: Vec<Op> = current
            .keys()
            .into_iter()
            .filter(|key| !target.contains_key(*key))
            .map(|key| Op::Delete { key: key.to_string() })
            .collect();
        ops.extend(
            target
                .into_iter()
                .filter(|(key, value)| current.get(key) != Some(value))
                .map(|(key, value)| Op::Set { key, value }),
        );
        if !ops.is_empty() {
            debug!(name = %definition.name, fields = ops.len(), "patching schema in place");
            self.store().apply_ops(id, ops)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Records
    // ---------------------------------------------------------------

    /// Two passes: every config gets an ID first, then references between
    /// configs are filled in and each config is validated in full.
    async fn seed_configs(
        &self,
        bundle: &SeedBundle,
        summary: &mut SeedSummary,
        created: &mut Vec<ObjectId>,
    ) -> SeedResult<()> {
        let mut pending = Vec::new();
        let mut deferred = Vec::new();

        for spec in bundle.ordered_configs() {
            if !spec.has_refs() {
                match self.create_instance(&spec.schema, spec.data.clone(), ValidationMode::Full, created).await {
                    Ok(id) => {
                        summary.configs.insert(spec.key.clone(), id);
                    }
                    Err(e) => self.record_failure(summary, RecordKind::Config, &spec.key, e)?,
                }
                continue;
            }
            match self.schema_kind(&spec.schema) {
                Ok(ObjectKind::Map) => {}
                Ok(_) => {
                    deferred.push(spec);
                    continue;
                }
                Err(e) => {
                    self.record_failure(summary, RecordKind::Config, &spec.key, e)?;
                    continue;
                }
            }
            let bare = strip_config_refs(&spec.data);
            match self.create_instance(&spec.schema, bare, ValidationMode::Partial, created).await {
                Ok(id) => {
                    summary.configs.insert(spec.key.clone(), id);
                    pending.push(PendingConfig { spec, id });
                }
                Err(e) => self.record_failure(summary, RecordKind::Config, &spec.key, e)?,
            }
        }

        for PendingConfig { spec, id } in pending {
            let fields = Value::Object(config_ref_fields(&spec.data));
            let result = match resolve_config_refs(&fields, &summary.configs) {
                Ok(resolved) => self.ops.update(&id, resolved).await.map(|_| ()),
                Err(key) => Err(unknown_config(&key)),
            };
            if let Err(e) = result {
                self.record_failure(summary, RecordKind::Config, &spec.key, e)?;
            }
        }

        for spec in deferred {
            let result = match resolve_config_refs(&spec.data, &summary.configs) {
                Ok(data) => {
                    self.create_instance(&spec.schema, data, ValidationMode::Full, created)
                        .await
                }
                Err(key) => Err(unknown_config(&key)),
            };
            match result {
                Ok(id) => {
                    summary.configs.insert(spec.key.clone(), id);
                }
                Err(e) => self.record_failure(summary, RecordKind::Config, &spec.key, e)?,
            }
        }
        Ok(())
    }

    async fn seed_data(
        &self,
        bundle: &SeedBundle,
        summary: &mut SeedSummary,
        created: &mut Vec<ObjectId>,
    ) -> SeedResult<()> {
        for (collection, records) in &bundle.data {
            for (index, record) in records.iter().enumerate() {
                match self.seed_record(record, &summary.configs, created).await {
                    Ok(id) => summary.data.entry(collection.clone()).or_default().push(id),
                    Err(e) => {
                        let key = format!("{collection}[{index}]");
                        self.record_failure(summary, RecordKind::Data, &key, e)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Create one data record, creating `$nested` field objects first.
    async fn seed_record(
        &self,
        record: &DataRecord,
        configs: &BTreeMap<String, ObjectId>,
        created: &mut Vec<ObjectId>,
    ) -> OpsResult<ObjectId> {
        let data = resolve_config_refs(&record.data, configs).map_err(|key| unknown_config(&key))?;
        let data = match data {
            Value::Object(fields) => {
                let mut out = Map::new();
                for (field, value) in fields {
                    let value = match as_nested(&value) {
                        Some(nested) => {
                            let nested = nested.map_err(|e| {
                                OpsError::InvalidInput(format!("nested field {field:?}: {e}"))
                            })?;
                            let id = self
                                .create_instance(&nested.schema, nested.data, ValidationMode::Full, created)
                                .await?;
                            Value::String(id.to_string())
                        }
                        None => value,
                    };
                    out.insert(field, value);
                }
                Value::Object(out)
            }
            other => other,
        };
        self.create_instance(&record.schema, data, ValidationMode::Full, created)
            .await
    }

    /// Create an instance and record it in the seed manifest.
    async fn create_instance(
        &self,
        schema: &str,
        data: Value,
        mode: ValidationMode,
        created: &mut Vec<ObjectId>,
    ) -> OpsResult<ObjectId> {
        let result = self.ops.create_with_mode(schema, data, mode).await?;
        self.registry().record_manifest(&[result.id])?;
        created.push(result.id);
        Ok(result.id)
    }

    fn schema_kind(&self, schema: &str) -> OpsResult<ObjectKind> {
        let id = self.ops.resolve_schema(schema)?;
        self.registry()
            .load_schema(&id)
            .map_err(OpsError::from)?
            .map(|definition| definition.kind)
            .ok_or_else(|| OpsError::SchemaNotFound(schema.to_string()))
    }

    fn record_failure(
        &self,
        summary: &mut SeedSummary,
        kind: RecordKind,
        key: &str,
        error: OpsError,
    ) -> SeedResult<()> {
        if self.config.halt_on_record_error {
            return Err(SeedError::Record {
                key: key.to_string(),
                source: error,
            });
        }
        warn!(?kind, key, error = %error, "record failed; continuing");
        summary.failures.push(RecordFailure {
            kind,
            key: key.to_string(),
            error: error.to_string(),
        });
        Ok(())
    }

    // ---------------------------------------------------------------
    // Sweep
    // ---------------------------------------------------------------

    /// Index everything this seed created, in case the write path missed
    /// an object.
    async fn sweep(&self, ids: &[ObjectId]) {
        let mut failed = 0usize;
        for id in ids {
            match self.indexer().ensure_indexed(id).await {
                Ok(outcome) => debug!(object = %id.short_hex(), ?outcome, "sweep indexed object"),
                Err(e) => {
                    failed += 1;
                    warn!(object = %id.short_hex(), error = %e, "sweep could not index object");
                }
            }
        }
        info!(count = ids.len(), failed, "index sweep finished");
    }
}

fn unknown_config(key: &str) -> OpsError {
    OpsError::InvalidInput(format!("unknown config reference {key:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_index::{IndexConfig, IndexState, IndexingHook};
    use cairn_ops::BasicEvaluator;
    use cairn_registry::RegistryState;
    use cairn_store::{create_account, InMemoryCoStore};

    struct Fixture {
        store: Arc<InMemoryCoStore>,
        manager: Arc<IndexManager>,
        hook: Arc<IndexingHook>,
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
        let manager = Arc::new(IndexManager::new(
            registry,
            Arc::new(IndexState::new()),
            IndexConfig::default(),
        ));
        let hook = IndexingHook::install(&manager);
        Fixture {
            store,
            manager,
            hook,
        }
    }

    fn seeder(fx: &Fixture, halt_on_record_error: bool) -> Seeder {
        Seeder::new(
            fx.manager.clone(),
            Arc::new(BasicEvaluator),
            OpsConfig::default(),
            SeedConfig {
                halt_on_record_error,
            },
        )
    }

    fn bundle() -> SeedBundle {
        serde_json::from_value(json!({
            "schemas": [
                {"name": "app/schema/view", "shape": {
                    "properties": {"title": "string", "style": {"$co": "app/schema/style"}},
                    "required": ["title", "style"]
                }},
                {"name": "app/schema/style", "shape": {
                    "properties": {"bg": "string", "view": {"$co": "app/schema/view"}},
                    "required": ["bg"]
                }},
                {"name": "app/schema/task", "indexing": true, "shape": {
                    "properties": {"title": "string", "notes": {"$co": "app/schema/notes"}},
                    "required": ["title"]
                }},
                {"name": "app/schema/notes", "kind": "list", "shape": "string"}
            ],
            "configs": [
                {"key": "main", "schema": "app/schema/view", "category": "view",
                 "data": {"title": "Main", "style": {"$config": "dark"}}},
                {"key": "dark", "schema": "app/schema/style", "category": "style",
                 "data": {"bg": "#000", "view": {"$config": "main"}}}
            ],
            "data": {
                "tasks": [
                    {"schema": "app/schema/task", "data": {"title": "one"}},
                    {"schema": "app/schema/task", "data": {
                        "title": "two",
                        "notes": {"$nested": {"schema": "app/schema/notes", "data": ["a", "b"]}}
                    }}
                ]
            }
        }))
        .unwrap()
    }

    fn seeded(report: SeedReport) -> SeedSummary {
        match report {
            SeedReport::Seeded(summary) => summary,
            SeedReport::Skipped { reason } => panic!("unexpectedly skipped: {reason}"),
        }
    }

    // ----------------------------------------------------------------
    // Schemas
    // ----------------------------------------------------------------

    #[tokio::test]
    async fn meta_schema_references_itself() {
        let fx = fixture();
        let summary = seeded(seeder(&fx, false).seed(&bundle()).await.unwrap());
        let meta_id = summary.registry[META_SCHEMA_NAME];

        let content = fx.store.content(&meta_id).unwrap().unwrap();
        assert_eq!(content.get_id(SCHEMA_KEY), Some(meta_id));
        meta_schema()
            .validate_data(&content.to_json(), ValidationMode::Full)
            .unwrap();

        for id in summary.schemas.values() {
            let header = fx.store.header(id).unwrap().unwrap();
            assert_eq!(header.object_type(), Some(object_type::SCHEMA));
            assert_eq!(header.schema_ref(), Some(meta_id.to_string().as_str()));
            let stored = fx.store.content(id).unwrap().unwrap();
            assert_eq!(stored.get_id(SCHEMA_KEY), Some(meta_id));
        }
    }

    #[tokio::test]
    async fn cyclic_references_resolve_to_ids() {
        let fx = fixture();
        let summary = seeded(seeder(&fx, false).seed(&bundle()).await.unwrap());
        let registry = fx.manager.registry();
        for name in ["app/schema/view", "app/schema/style", "app/schema/task"] {
            let definition = registry.load_schema(&summary.schemas[name]).unwrap().unwrap();
            assert!(definition.references().is_empty(), "{name} still symbolic");
        }
        let view = registry
            .load_schema(&summary.schemas["app/schema/view"])
            .unwrap()
            .unwrap();
        assert_eq!(
            view.shape.property("style").unwrap().to_json(),
            json!({"$co": summary.schemas["app/schema/style"].to_string()})
        );
    }

    #[tokio::test]
    async fn unresolvable_schemas_abort_before_writing() {
        let fx = fixture();
        let mut bundle = bundle();
        bundle.schemas.push(json!({
            "name": "app/schema/card",
            "shape": {"properties": {"owner": {"$co": "lib/schema/user"}}}
        }));
        let err = seeder(&fx, false).seed(&bundle).await.unwrap_err();
        assert!(matches!(
            &err,
            SeedError::UnresolvedReferences { schema, missing }
                if schema == "app/schema/card" && missing == &["lib/schema/user".to_string()]
        ));
        let registry = fx.manager.registry();
        assert_eq!(registry.resolve("app/schema/task").unwrap(), None);
        assert!(registry.manifest().unwrap().is_empty());
    }

    // ----------------------------------------------------------------
    // Records
    // ----------------------------------------------------------------

    #[tokio::test]
    async fn configs_reference_each_other() {
        let fx = fixture();
        let summary = seeded(seeder(&fx, false).seed(&bundle()).await.unwrap());
        assert!(summary.failures.is_empty(), "{:?}", summary.failures);

        let main = summary.configs["main"];
        let dark = summary.configs["dark"];
        let main_content = fx.store.content(&main).unwrap().unwrap();
        let dark_content = fx.store.content(&dark).unwrap().unwrap();
        assert_eq!(main_content.get_id("style"), Some(dark));
        assert_eq!(main_content.get_str("title"), Some("Main"));
        assert_eq!(dark_content.get_id("view"), Some(main));
    }

    #[tokio::test]
    async fn nested_records_are_created_first() {
        let fx = fixture();
        let summary = seeded(seeder(&fx, false).seed(&bundle()).await.unwrap());
        let tasks = &summary.data["tasks"];
        assert_eq!(tasks.len(), 2);

        let second = fx.store.content(&tasks[1]).unwrap().unwrap();
        let notes = second.get_id("notes").unwrap();
        let notes_content = fx.store.content(&notes).unwrap().unwrap();
        assert_eq!(notes_content.items(), &[json!("a"), json!("b")]);
        assert!(fx.manager.registry().manifest().unwrap().contains(&notes));
    }

    #[tokio::test]
    async fn seeded_instances_are_indexed() {
        let fx = fixture();
        let summary = seeded(seeder(&fx, false).seed(&bundle()).await.unwrap());
        let task = summary.schemas["app/schema/task"];

        let mut members = fx.manager.members(&task).unwrap();
        members.sort();
        let mut expected = summary.data["tasks"].clone();
        expected.sort();
        assert_eq!(members, expected);
        fx.hook.drain().await;
        assert_eq!(fx.manager.members(&task).unwrap().len(), 2);
        assert!(fx.manager.unclassified_members().unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_failures_are_collected_by_default() {
        let fx = fixture();
        let mut bundle = bundle();
        bundle
            .data
            .get_mut("tasks")
            .unwrap()
            .push(serde_json::from_value(json!({"schema": "app/schema/task", "data": {"title": 7}})).unwrap());
        let summary = seeded(seeder(&fx, false).seed(&bundle).await.unwrap());
        assert_eq!(summary.data["tasks"].len(), 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].kind, RecordKind::Data);
        assert_eq!(summary.failures[0].key, "tasks[2]");
        assert!(summary.failures[0].error.contains("app/schema/task"));
    }

    #[tokio::test]
    async fn record_failures_halt_when_configured() {
        let fx = fixture();
        let mut bundle = bundle();
        bundle.configs[1].data = json!({"bg": 1, "view": {"$config": "main"}});
        let err = seeder(&fx, true).seed(&bundle).await.unwrap_err();
        assert!(matches!(err, SeedError::Record { ref key, .. } if key == "dark"));
    }

    // ----------------------------------------------------------------
    // Reseeding
    // ----------------------------------------------------------------

    #[tokio::test]
    async fn second_seed_is_skipped() {
        let fx = fixture();
        let seeder = seeder(&fx, false);
        seeded(seeder.seed(&bundle()).await.unwrap());
        fx.hook.drain().await;
        let count = fx.store.len();

        let report = seeder.seed(&bundle()).await.unwrap();
        assert!(report.is_skipped());
        assert_eq!(fx.store.len(), count);
    }

    #[tokio::test]
    async fn forced_reseed_keeps_schema_ids_and_replaces_instances() {
        let fx = fixture();
        let seeder = seeder(&fx, false);
        let first = seeded(seeder.seed(&bundle()).await.unwrap());
        fx.hook.drain().await;

        let mut again = bundle();
        again.options.force_fresh_seed = true;
        let second = seeded(seeder.seed(&again).await.unwrap());
        fx.hook.drain().await;

        assert_eq!(first.schemas, second.schemas);
        assert_eq!(first.registry, second.registry);
        assert_ne!(first.configs["main"], second.configs["main"]);

        let task = second.schemas["app/schema/task"];
        let mut members = fx.manager.members(&task).unwrap();
        members.sort();
        let mut expected = second.data["tasks"].clone();
        expected.sort();
        assert_eq!(members, expected);
        for old in &first.data["tasks"] {
            assert!(fx.store.is_available(old));
        }

        let manifest = fx.manager.registry().manifest().unwrap();
        assert!(manifest.contains(&second.configs["main"]));
        assert!(!manifest.contains(&first.configs["main"]));

        // The replaced records are still local; a full sweep leaves them out.
        let report = fx.manager.reconcile().await;
        assert_eq!(report.failed, 0);
        let mut members = fx.manager.members(&task).unwrap();
        members.sort();
        assert_eq!(members, expected);
    }
}
