use serde::{Deserialize, Serialize};

use cairn_types::ObjectId;

use crate::content::Op;
use crate::error::StoreResult;
use crate::header::Header;

/// Where a write message came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOrigin {
    /// Issued by code running against this store.
    Local,
    /// Applied on behalf of a peer during sync.
    Remote,
}

/// The unit of every write to the store.
///
/// A message carries the header only when it introduces the object (its
/// first write, or a full-state transfer from a peer); later messages carry
/// ops alone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WriteMessage {
    pub id: ObjectId,
    pub header: Option<Header>,
    pub ops: Vec<Op>,
    pub origin: WriteOrigin,
}

impl WriteMessage {
    /// A local message that creates the object described by `header`.
    pub fn create(header: Header, ops: Vec<Op>) -> StoreResult<Self> {
        let id = header.compute_id()?;
        Ok(Self {
            id,
            header: Some(header),
            ops,
            origin: WriteOrigin::Local,
        })
    }

    /// A local message that mutates an existing object.
    pub fn update(id: ObjectId, ops: Vec<Op>) -> Self {
        Self {
            id,
            header: None,
            ops,
            origin: WriteOrigin::Local,
        }
    }

    /// The same message, marked as arriving from a peer.
    pub fn into_remote(mut self) -> Self {
        self.origin = WriteOrigin::Remote;
        self
    }

    /// Returns `true` if the message introduces the object's header.
    pub fn is_creation(&self) -> bool {
        self.header.is_some()
    }
}
