use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use cairn_types::{ObjectId, ObjectKind};

use crate::content::{Content, Op};
use crate::error::{StoreError, StoreResult};
use crate::header::{Header, Meta};
use crate::message::WriteMessage;
use crate::middleware::WriteMiddleware;

/// Handle to a locally known object.
///
/// Carries the kind discriminant explicitly so callers never need to inspect
/// content to learn what operations it supports.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectHandle {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub header: Header,
}

impl ObjectHandle {
    /// The raw schema reference from the header, if any.
    pub fn schema_ref(&self) -> Option<&str> {
        self.header.schema_ref()
    }
}

/// The replicated object store substrate.
///
/// All implementations must satisfy these invariants:
/// - [`write`](CoStore::write) is the single entry point for every mutation,
///   local or remote, and runs the registered middlewares around the apply.
/// - An object is *available* once its header and content are known locally.
/// - Reads never block; waiting is explicit and bounded
///   ([`wait_for_available`](CoStore::wait_for_available)).
#[async_trait]
pub trait CoStore: Send + Sync {
    /// Apply a write message through the middleware chain.
    fn write(&self, message: WriteMessage) -> StoreResult<()>;

    /// Header of a locally available object.
    fn header(&self, id: &ObjectId) -> StoreResult<Option<Header>>;

    /// Current content of a locally available object.
    fn content(&self, id: &ObjectId) -> StoreResult<Option<Content>>;

    /// Returns `true` if the object's header and content are known locally.
    fn is_available(&self, id: &ObjectId) -> bool;

    /// Every locally available object ID, sorted.
    fn object_ids(&self) -> Vec<ObjectId>;

    /// Live view of an object's content. The receiver starts at the current
    /// content (`None` while unavailable) and observes every later write.
    fn subscribe(&self, id: &ObjectId) -> watch::Receiver<Option<Content>>;

    /// Append a middleware to the write path.
    fn add_middleware(&self, middleware: Arc<dyn WriteMiddleware>);

    /// Wait until the object is available locally, up to `timeout`.
    ///
    /// Returns `false` if the deadline passes first.
    async fn wait_for_available(&self, id: &ObjectId, timeout: Duration) -> bool;

    /// Wait until the object's writes are durably persisted.
    async fn wait_for_durable(&self, id: &ObjectId) -> StoreResult<()>;

    // ------------------------------------------------------------------
    // Provided helpers: every one of them goes through `write`.
    // ------------------------------------------------------------------

    /// Create an object with a fresh header.
    fn create_object(
        &self,
        kind: ObjectKind,
        group: Option<ObjectId>,
        init: Option<Content>,
        meta: Meta,
    ) -> StoreResult<ObjectHandle> {
        self.create_with_header(Header::new(kind, group, meta), init)
    }

    /// Create an object from a prepared header.
    ///
    /// Lets callers learn the ID (via [`Header::compute_id`]) before the
    /// creating write enters the middleware chain.
    fn create_with_header(&self, header: Header, init: Option<Content>) -> StoreResult<ObjectHandle> {
        if let Some(content) = &init {
            if content.kind() != header.kind {
                return Err(StoreError::KindMismatch {
                    expected: header.kind,
                    actual: content.kind(),
                });
            }
        }
        let ops = init.map(|c| c.to_ops()).unwrap_or_default();
        let message = WriteMessage::create(header.clone(), ops)?;
        let id = message.id;
        self.write(message)?;
        Ok(ObjectHandle {
            id,
            kind: header.kind,
            header,
        })
    }

    /// Handle for a locally available object.
    fn get_object(&self, id: &ObjectId) -> StoreResult<Option<ObjectHandle>> {
        Ok(self.header(id)?.map(|header| ObjectHandle {
            id: *id,
            kind: header.kind,
            header,
        }))
    }

    fn apply_ops(&self, id: &ObjectId, ops: Vec<Op>) -> StoreResult<()> {
        self.write(WriteMessage::update(*id, ops))
    }

    fn map_set(&self, id: &ObjectId, key: &str, value: Value) -> StoreResult<()> {
        self.apply_ops(
            id,
            vec![Op::Set {
                key: key.to_string(),
                value,
            }],
        )
    }

    fn map_delete(&self, id: &ObjectId, key: &str) -> StoreResult<()> {
        self.apply_ops(id, vec![Op::Delete { key: key.to_string() }])
    }

    fn list_append(&self, id: &ObjectId, value: Value) -> StoreResult<()> {
        self.apply_ops(id, vec![Op::Append { value }])
    }

    fn list_delete_at(&self, id: &ObjectId, index: usize) -> StoreResult<()> {
        self.apply_ops(id, vec![Op::DeleteAt { index }])
    }

    fn log_push(&self, id: &ObjectId, value: Value) -> StoreResult<()> {
        self.apply_ops(id, vec![Op::Push { value }])
    }
}
