//! Write-path indexing.
//!
//! [`IndexingHook`] sits in the store's middleware chain. For every write it
//! runs a synchronous, non-blocking pre-check, hands the message on, and,
//! if the object qualifies and is available locally, schedules indexing on
//! a task set it owns. Indexing never runs inline and never fails the write.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use cairn_store::{Next, StoreResult, WriteMessage, WriteMiddleware};
use cairn_types::ObjectId;

use crate::manager::IndexManager;

/// Counters describing what the hook did with the writes it saw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HookStats {
    /// Indexing tasks spawned.
    pub scheduled: u64,
    /// Writes to principals, groups, or registry/index objects.
    pub skipped_internal: u64,
    /// Writes made while the registry root was not loaded.
    pub skipped_no_root: u64,
    /// Writes whose object was not available after the write (remote ops
    /// ahead of their header).
    pub skipped_unavailable: u64,
    /// Writes for an object whose indexing was already in flight.
    pub deduplicated: u64,
    /// Indexing tasks that returned an error.
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    scheduled: AtomicU64,
    skipped_internal: AtomicU64,
    skipped_no_root: AtomicU64,
    skipped_unavailable: AtomicU64,
    deduplicated: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> HookStats {
        HookStats {
            scheduled: self.scheduled.load(Ordering::Relaxed),
            skipped_internal: self.skipped_internal.load(Ordering::Relaxed),
            skipped_no_root: self.skipped_no_root.load(Ordering::Relaxed),
            skipped_unavailable: self.skipped_unavailable.load(Ordering::Relaxed),
            deduplicated: self.deduplicated.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Middleware that keeps indexes current as writes arrive.
pub struct IndexingHook {
    manager: Weak<IndexManager>,
    tasks: Mutex<JoinSet<()>>,
    counters: Arc<Counters>,
}

impl std::fmt::Debug for IndexingHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexingHook")
            .field("stats", &self.stats())
            .finish()
    }
}

impl IndexingHook {
    pub fn new(manager: &Arc<IndexManager>) -> Self {
        Self {
            manager: Arc::downgrade(manager),
            tasks: Mutex::new(JoinSet::new()),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Create a hook for `manager` and add it to the manager's store.
    pub fn install(manager: &Arc<IndexManager>) -> Arc<Self> {
        let hook = Arc::new(Self::new(manager));
        manager.registry().store().add_middleware(hook.clone());
        hook
    }

    pub fn stats(&self) -> HookStats {
        self.counters.snapshot()
    }

    /// Number of spawned tasks not yet reaped.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.lock().expect("hook task lock poisoned").len()
    }

    /// Wait for every outstanding indexing task, including tasks spawned
    /// while draining.
    pub async fn drain(&self) {
        loop {
            let mut tasks = std::mem::take(&mut *self.tasks.lock().expect("hook task lock poisoned"));
            if tasks.is_empty() {
                return;
            }
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    if e.is_panic() {
                        warn!(error = %e, "indexing task panicked");
                    }
                }
            }
        }
    }

    /// Abort every outstanding indexing task. In-flight slots are released
    /// as the tasks are dropped.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock().expect("hook task lock poisoned");
        let count = tasks.len();
        tasks.abort_all();
        debug!(count, "aborted indexing tasks");
    }

    /// Synchronous pre-check. Returns the manager when the write may need
    /// indexing.
    fn pre_check(&self, message: &WriteMessage) -> Option<Arc<IndexManager>> {
        let manager = self.manager.upgrade()?;
        let registry = manager.registry();

        if registry.state().is_internal(&message.id) {
            Counters::bump(&self.counters.skipped_internal);
            return None;
        }
        let header = match &message.header {
            Some(header) => Some(header.clone()),
            None => registry.store().header(&message.id).ok().flatten(),
        };
        if header.as_ref().is_some_and(|h| h.is_internal()) {
            Counters::bump(&self.counters.skipped_internal);
            return None;
        }
        if registry.loaded_root().is_none() {
            Counters::bump(&self.counters.skipped_no_root);
            return None;
        }
        Some(manager)
    }

    fn schedule(&self, manager: Arc<IndexManager>, id: ObjectId) {
        if !manager.registry().store().is_available(&id) {
            debug!(object = %id.short_hex(), "written object not available yet; indexing on arrival");
            Counters::bump(&self.counters.skipped_unavailable);
            return;
        }
        let Some(guard) = manager.state().try_claim(id) else {
            Counters::bump(&self.counters.deduplicated);
            return;
        };
        let Ok(handle) = Handle::try_current() else {
            warn!(object = %id.short_hex(), "no async runtime; indexing left to reconciliation");
            return;
        };

        let counters = self.counters.clone();
        let mut tasks = self.tasks.lock().expect("hook task lock poisoned");
        while tasks.try_join_next().is_some() {}
        tasks.spawn_on(
            async move {
                let _guard = guard;
                tokio::task::yield_now().await;
                if let Err(e) = manager.index_claimed(&id) {
                    Counters::bump(&counters.failed);
                    warn!(object = %id.short_hex(), error = %e, "indexing failed");
                }
            },
            &handle,
        );
        Counters::bump(&self.counters.scheduled);
    }
}

impl WriteMiddleware for IndexingHook {
    fn name(&self) -> &str {
        "indexing"
    }

    fn handle(&self, message: &WriteMessage, next: Next<'_>) -> StoreResult<()> {
        let candidate = self.pre_check(message);
        next.run(message)?;
        if let Some(manager) = candidate {
            self.schedule(manager, message.id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::tests::{create_instance, create_schema, setup};
    use crate::manager::IndexOutcome;
    use cairn_store::{CoStore, InMemoryCoStore};
    use serde_json::json;

    fn install() -> (Arc<InMemoryCoStore>, Arc<IndexManager>, Arc<IndexingHook>) {
        let (store, manager) = setup();
        let hook = IndexingHook::install(&manager);
        (store, manager, hook)
    }

    #[tokio::test]
    async fn writes_schedule_deferred_indexing() {
        let (store, manager, hook) = install();
        let schema = create_schema(&store, "app/schema/task", true);
        let mut ids: Vec<ObjectId> = (0..3).map(|_| create_instance(&store, Some(&schema))).collect();

        assert!(manager.members(&schema).unwrap().is_empty());
        hook.drain().await;

        let mut members = manager.members(&schema).unwrap();
        members.sort();
        ids.sort();
        assert_eq!(members, ids);
        assert_eq!(manager.registry().resolve("app/schema/task").unwrap(), Some(schema));
        assert_eq!(hook.stats().failed, 0);
        assert_eq!(manager.state().in_flight_count(), 0);
    }

    #[tokio::test]
    async fn internal_writes_never_schedule() {
        let (store, manager, hook) = install();
        let root = manager.registry().loaded_root().unwrap();
        let before = hook.stats();

        store.map_set(&root.id, "note", json!("x")).unwrap();
        store.list_append(&root.unclassified, json!("y")).unwrap();
        let list = manager
            .registry()
            .create_internal(cairn_types::ObjectKind::List, cairn_store::object_type::INDEX_LIST, None)
            .unwrap();
        store.list_append(&list, json!("z")).unwrap();
        hook.drain().await;

        let after = hook.stats();
        assert_eq!(after.scheduled, before.scheduled);
        assert_eq!(after.skipped_internal - before.skipped_internal, 4);
    }

    #[tokio::test]
    async fn indexing_writes_do_not_recurse() {
        let (store, _manager, hook) = install();
        create_instance(&store, None);
        hook.drain().await;
        // One create, followed by the unclassified-list append it triggered.
        let stats = hook.stats();
        assert_eq!(stats.scheduled, 1);
        assert!(stats.skipped_internal >= 1);
    }

    #[tokio::test]
    async fn repeated_writes_are_deduplicated() {
        let (store, manager, hook) = install();
        let object = create_instance(&store, None);
        store.map_set(&object, "title", json!("y")).unwrap();
        store.map_set(&object, "title", json!("z")).unwrap();
        hook.drain().await;

        let stats = hook.stats();
        assert_eq!(stats.scheduled, 1);
        assert_eq!(stats.deduplicated, 2);
        assert_eq!(manager.unclassified_members().unwrap(), vec![object]);
    }

    #[tokio::test]
    async fn remote_ops_ahead_of_header_wait_for_arrival() {
        let (store, manager, hook) = install();
        let peer = InMemoryCoStore::new();
        let remote = peer.create_object(cairn_types::ObjectKind::Map, None, None, Default::default()).unwrap();
        peer.map_set(&remote.id, "title", json!("t")).unwrap();
        let full = peer.export_message(&remote.id).unwrap();

        let ops_only = WriteMessage {
            header: None,
            ..full.clone()
        };
        store.apply_remote(ops_only).unwrap();
        hook.drain().await;
        assert_eq!(hook.stats().skipped_unavailable, 1);
        assert!(manager.unclassified_members().unwrap().is_empty());

        store.apply_remote(full).unwrap();
        hook.drain().await;
        assert_eq!(manager.unclassified_members().unwrap(), vec![remote.id]);
    }

    #[test]
    fn writes_outside_runtime_do_not_fail() {
        let (store, manager, hook) = install();
        let object = create_instance(&store, None);
        assert!(store.is_available(&object));
        assert_eq!(hook.stats().scheduled, 0);
        assert_eq!(manager.state().in_flight_count(), 0);
        assert_eq!(manager.index_object(&object).unwrap(), IndexOutcome::Unclassified);
    }

    #[tokio::test]
    async fn writes_before_root_are_skipped() {
        let store = Arc::new(InMemoryCoStore::new());
        let account = cairn_store::create_account(store.as_ref(), "bob").unwrap();
        let registry = Arc::new(cairn_registry::Registry::new(
            store.clone(),
            account,
            None,
            Arc::new(cairn_registry::RegistryState::new()),
        ));
        let manager = Arc::new(IndexManager::new(
            registry,
            Arc::new(crate::state::IndexState::new()),
            crate::config::IndexConfig::default(),
        ));
        let hook = IndexingHook::install(&manager);

        create_instance(&store, None);
        hook.drain().await;
        assert_eq!(hook.stats().skipped_no_root, 1);
        assert_eq!(hook.stats().scheduled, 0);
    }

    #[tokio::test]
    async fn shutdown_releases_in_flight_slots() {
        let (store, manager, hook) = install();
        create_instance(&store, None);
        assert_eq!(hook.pending_tasks(), 1);
        hook.shutdown();
        hook.drain().await;
        assert_eq!(manager.state().in_flight_count(), 0);
    }
}
