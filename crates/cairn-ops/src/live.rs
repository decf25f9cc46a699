use serde_json::Value;
use tokio::sync::watch;

use cairn_store::Content;
use cairn_types::ObjectId;

use crate::error::{OpsError, OpsResult};

/// What [`Operations::read`](crate::Operations::read) subscribes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadTarget {
    /// A single object.
    Object(ObjectId),
    /// The index list of a schema.
    Schema(ObjectId),
    /// The unclassified list.
    Unclassified,
}

/// A standing subscription to one object's content.
///
/// Starts at the content current when the read was made (`None` while the
/// object is not available locally) and follows every later write.
#[derive(Debug, Clone)]
pub struct LiveValue {
    id: ObjectId,
    rx: watch::Receiver<Option<Content>>,
}

impl LiveValue {
    pub fn new(id: ObjectId, rx: watch::Receiver<Option<Content>>) -> Self {
        Self { id, rx }
    }

    /// The observed object (for index views, the index list).
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn current(&self) -> Option<Content> {
        self.rx.borrow().clone()
    }

    /// Current content as JSON, `null` while unavailable.
    pub fn to_json(&self) -> Value {
        self.rx
            .borrow()
            .as_ref()
            .map(Content::to_json)
            .unwrap_or(Value::Null)
    }

    /// Object IDs held by a list or log, in order.
    pub fn ids(&self) -> Vec<ObjectId> {
        self.rx
            .borrow()
            .as_ref()
            .map(Content::id_items)
            .unwrap_or_default()
    }

    /// Wait for the next change and return the new content.
    pub async fn changed(&mut self) -> OpsResult<Option<Content>> {
        self.rx
            .changed()
            .await
            .map_err(|_| OpsError::Closed(self.id))?;
        Ok(self.rx.borrow_and_update().clone())
    }
}
