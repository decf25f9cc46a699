use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use cairn_index::{HookStats, IndexManager, IndexState, IndexingHook, ReconcileReport};
use cairn_ops::{BasicEvaluator, Evaluator, Operations};
use cairn_registry::{Registry, RegistryState};
use cairn_seed::{SeedBundle, SeedReport, Seeder};
use cairn_store::{create_account, InMemoryCoStore};
use cairn_types::ObjectId;

use crate::config::{read_file, CairnConfig};
use crate::error::{SdkError, SdkResult};

/// Index membership at a point in time.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct IndexSummary {
    /// Member count per indexed schema name.
    pub schemas: BTreeMap<String, usize>,
    pub unclassified: usize,
}

/// One store instance with its registry, indexer, write hook, operations,
/// and seeder. All per-store state lives here; nothing is global.
pub struct Cairn {
    config: CairnConfig,
    store: Arc<InMemoryCoStore>,
    account: ObjectId,
    indexer: Arc<IndexManager>,
    hook: Arc<IndexingHook>,
    ops: Operations,
    seeder: Seeder,
}

impl std::fmt::Debug for Cairn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cairn")
            .field("account", &self.account)
            .field("objects", &self.store.len())
            .field("hook", &self.hook)
            .finish()
    }
}

impl Cairn {
    /// Open a fresh in-memory store with the basic expression evaluator.
    pub fn open(config: CairnConfig) -> SdkResult<Self> {
        Self::with_evaluator(config, Arc::new(BasicEvaluator))
    }

    pub fn with_evaluator(config: CairnConfig, evaluator: Arc<dyn Evaluator>) -> SdkResult<Self> {
        let store = Arc::new(InMemoryCoStore::new());
        let account = create_account(store.as_ref(), &config.account)?;
        let registry = Arc::new(Registry::new(
            store.clone(),
            account,
            None,
            Arc::new(RegistryState::new()),
        ));
        registry.ensure_root()?.ok_or(SdkError::RootUnavailable)?;

        let indexer = Arc::new(IndexManager::new(
            registry,
            Arc::new(IndexState::new()),
            config.indexing.clone(),
        ));
        let hook = IndexingHook::install(&indexer);
        let ops = Operations::new(indexer.clone(), evaluator.clone(), config.ops.clone());
        let seeder = Seeder::new(
            indexer.clone(),
            evaluator,
            config.ops.clone(),
            config.seed.clone(),
        );
        info!(account = %account.short_hex(), "opened store");

        Ok(Self {
            config,
            store,
            account,
            indexer,
            hook,
            ops,
            seeder,
        })
    }

    // ---- Accessors ----

    pub fn config(&self) -> &CairnConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<InMemoryCoStore> {
        &self.store
    }

    pub fn account(&self) -> ObjectId {
        self.account
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.indexer.registry()
    }

    pub fn indexer(&self) -> &Arc<IndexManager> {
        &self.indexer
    }

    /// Runtime operations. Schemas are referenced by object ID.
    pub fn ops(&self) -> &Operations {
        &self.ops
    }

    pub fn hook_stats(&self) -> HookStats {
        self.hook.stats()
    }

    // ---- Seeding ----

    pub async fn seed(&self, bundle: &SeedBundle) -> SdkResult<SeedReport> {
        Ok(self.seeder.seed(bundle).await?)
    }

    pub fn load_bundle(path: impl AsRef<Path>) -> SdkResult<SeedBundle> {
        Ok(SeedBundle::from_json_str(&read_file(path.as_ref())?)?)
    }

    // ---- Registry and indexes ----

    /// ID of a registered schema.
    pub fn schema_id(&self, name: &str) -> SdkResult<ObjectId> {
        self.registry()
            .resolve(name)?
            .ok_or_else(|| SdkError::UnknownSchema(name.to_string()))
    }

    /// Members of a registered schema's index.
    pub fn members(&self, name: &str) -> SdkResult<Vec<ObjectId>> {
        Ok(self.indexer.members(&self.schema_id(name)?)?)
    }

    pub fn index_summary(&self) -> SdkResult<IndexSummary> {
        let mut summary = IndexSummary::default();
        for (name, id) in self.registry().schemas()? {
            if self.indexer.index_list(&id)?.is_some() {
                summary
                    .schemas
                    .insert(name, self.indexer.members(&id)?.len());
            }
        }
        summary.unclassified = self.indexer.unclassified_members()?.len();
        Ok(summary)
    }

    // ---- Lifecycle ----

    /// Wait for every indexing task the write path has spawned.
    pub async fn drain(&self) {
        self.hook.drain().await;
    }

    pub async fn reconcile(&self) -> ReconcileReport {
        self.indexer.reconcile().await
    }

    /// Abort outstanding indexing tasks.
    pub fn shutdown(&self) {
        self.hook.shutdown();
    }
}
