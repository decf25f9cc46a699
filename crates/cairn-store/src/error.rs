use cairn_types::{ObjectId, ObjectKind, TypeError};

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object is not known to this store.
    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// The header hash does not match the ID the message claims.
    #[error("hash mismatch for {id}: header hashes to {computed}")]
    HashMismatch { id: ObjectId, computed: ObjectId },

    /// An op was applied to content of the wrong kind.
    #[error("kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        expected: ObjectKind,
        actual: ObjectKind,
    },

    /// A positional op referenced an index past the end of the content.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Initial or incoming content does not fit the object kind.
    #[error("invalid content: {0}")]
    InvalidContent(String),

    /// The object exists but is not an access group.
    #[error("object {0} is not an access group")]
    NotAGroup(ObjectId),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Malformed identifier or name.
    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
