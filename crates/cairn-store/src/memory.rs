use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Notify};
use tracing::{debug, warn};

use cairn_types::ObjectId;

use crate::content::{Content, Op};
use crate::error::{StoreError, StoreResult};
use crate::header::Header;
use crate::message::{WriteMessage, WriteOrigin};
use crate::middleware::{Next, WriteMiddleware};
use crate::traits::CoStore;

struct Entry {
    header: Header,
    content: Content,
}

#[derive(Default)]
struct StoreState {
    objects: HashMap<ObjectId, Entry>,
    /// Remote ops that arrived before their object's header.
    pending: HashMap<ObjectId, Vec<Op>>,
    watchers: HashMap<ObjectId, watch::Sender<Option<Content>>>,
}

/// In-memory, `HashMap`-based object store.
///
/// Intended for tests and embedding. Writes are durable as soon as they are
/// applied. Remote sync is simulated with [`export_message`] and
/// [`apply_remote`].
///
/// [`export_message`]: InMemoryCoStore::export_message
/// [`apply_remote`]: InMemoryCoStore::apply_remote
pub struct InMemoryCoStore {
    state: RwLock<StoreState>,
    middleware: RwLock<Vec<Arc<dyn WriteMiddleware>>>,
    arrivals: Notify,
    writes: AtomicU64,
}

impl InMemoryCoStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            middleware: RwLock::new(Vec::new()),
            arrivals: Notify::new(),
            writes: AtomicU64::new(0),
        }
    }

    /// Number of locally available objects.
    pub fn len(&self) -> usize {
        self.state.read().expect("store lock poisoned").objects.len()
    }

    /// Returns `true` if the store holds no available objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total write messages accepted through [`CoStore::write`].
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of objects with buffered remote ops awaiting their header.
    pub fn pending_count(&self) -> usize {
        self.state.read().expect("store lock poisoned").pending.len()
    }

    /// Full-state message for `id`, suitable for [`apply_remote`] on a peer.
    ///
    /// [`apply_remote`]: InMemoryCoStore::apply_remote
    pub fn export_message(&self, id: &ObjectId) -> Option<WriteMessage> {
        let state = self.state.read().expect("store lock poisoned");
        state.objects.get(id).map(|entry| WriteMessage {
            id: *id,
            header: Some(entry.header.clone()),
            ops: entry.content.to_ops(),
            origin: WriteOrigin::Remote,
        })
    }

    /// Apply a message received from a peer.
    pub fn apply_remote(&self, message: WriteMessage) -> StoreResult<()> {
        self.write(message.into_remote())
    }

    fn dispatch(
        &self,
        chain: &[Arc<dyn WriteMiddleware>],
        message: &WriteMessage,
    ) -> StoreResult<()> {
        match chain.split_first() {
            Some((head, rest)) => {
                let next = |m: &WriteMessage| self.dispatch(rest, m);
                head.handle(message, Next::new(&next))
            }
            None => self.apply(message),
        }
    }

    /// Innermost step of the write path.
    fn apply(&self, message: &WriteMessage) -> StoreResult<()> {
        let id = message.id;
        let mut guard = self.state.write().expect("store lock poisoned");
        let state = &mut *guard;

        let (new_header, mut content) = match state.objects.get(&id) {
            Some(entry) => (None, entry.content.clone()),
            None => match &message.header {
                Some(header) => {
                    let computed = header.compute_id()?;
                    if computed != id {
                        return Err(StoreError::HashMismatch { id, computed });
                    }
                    let mut content = Content::empty(header.kind);
                    for op in state.pending.get(&id).into_iter().flatten() {
                        if let Err(e) = content.apply(op) {
                            warn!(object = %id.short_hex(), error = %e, "dropping buffered op");
                        }
                    }
                    (Some(header.clone()), content)
                }
                None => {
                    if message.origin == WriteOrigin::Remote {
                        state
                            .pending
                            .entry(id)
                            .or_default()
                            .extend(message.ops.iter().cloned());
                        debug!(object = %id.short_hex(), "buffered remote ops ahead of header");
                        return Ok(());
                    }
                    return Err(StoreError::NotFound(id));
                }
            },
        };

        for op in &message.ops {
            content.apply(op)?;
        }

        let created = new_header.is_some();
        match new_header {
            Some(header) => {
                state.pending.remove(&id);
                state.objects.insert(
                    id,
                    Entry {
                        header,
                        content: content.clone(),
                    },
                );
            }
            None => {
                if let Some(entry) = state.objects.get_mut(&id) {
                    entry.content = content.clone();
                }
            }
        }
        if let Some(tx) = state.watchers.get(&id) {
            tx.send_replace(Some(content));
        }
        drop(guard);

        if created {
            self.arrivals.notify_waiters();
        }
        Ok(())
    }
}

impl Default for InMemoryCoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryCoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCoStore")
            .field("object_count", &self.len())
            .field("write_count", &self.write_count())
            .finish()
    }
}

#[async_trait]
impl CoStore for InMemoryCoStore {
    fn write(&self, message: WriteMessage) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let chain = self.middleware.read().expect("middleware lock poisoned").clone();
        self.dispatch(&chain, &message)
    }

    fn header(&self, id: &ObjectId) -> StoreResult<Option<Header>> {
        let state = self.state.read().expect("store lock poisoned");
        Ok(state.objects.get(id).map(|e| e.header.clone()))
    }

    fn content(&self, id: &ObjectId) -> StoreResult<Option<Content>> {
        let state = self.state.read().expect("store lock poisoned");
        Ok(state.objects.get(id).map(|e| e.content.clone()))
    }

    fn is_available(&self, id: &ObjectId) -> bool {
        let state = self.state.read().expect("store lock poisoned");
        state.objects.contains_key(id)
    }

    fn object_ids(&self) -> Vec<ObjectId> {
        let state = self.state.read().expect("store lock poisoned");
        let mut ids: Vec<ObjectId> = state.objects.keys().copied().collect();
        ids.sort();
        ids
    }

    fn subscribe(&self, id: &ObjectId) -> watch::Receiver<Option<Content>> {
        let mut state = self.state.write().expect("store lock poisoned");
        let current = state.objects.get(id).map(|e| e.content.clone());
        state
            .watchers
            .entry(*id)
            .or_insert_with(|| watch::channel(current).0)
            .subscribe()
    }

    fn add_middleware(&self, middleware: Arc<dyn WriteMiddleware>) {
        debug!(name = middleware.name(), "middleware added to write path");
        self.middleware
            .write()
            .expect("middleware lock poisoned")
            .push(middleware);
    }

    async fn wait_for_available(&self, id: &ObjectId, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.arrivals.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_available(id) {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.is_available(id);
            }
        }
    }

    async fn wait_for_durable(&self, id: &ObjectId) -> StoreResult<()> {
        if self.is_available(id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(*id))
        }
    }
}
