use cairn_registry::RegistryError;
use cairn_schema::SchemaError;
use cairn_store::StoreError;
use cairn_types::ObjectId;

/// Errors from indexing.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The object is not loaded locally.
    #[error("object not available: {0}")]
    NotAvailable(ObjectId),

    /// The object's schema is referenced but not loaded locally.
    #[error("schema {schema} of object {object} is not available")]
    SchemaUnavailable { object: ObjectId, schema: ObjectId },

    /// The schema reference in a header resolves to nothing.
    #[error("unknown schema reference {reference:?} on object {object}")]
    UnknownSchema { object: ObjectId, reference: String },

    /// The registry root is referenced but not loaded locally.
    #[error("registry root is not available")]
    RootUnavailable,

    /// A schema's index list is referenced but not loaded locally.
    #[error("index list {list} of schema {schema} is not available")]
    IndexUnavailable { schema: ObjectId, list: ObjectId },

    /// Another indexing attempt held the object past the availability
    /// timeout.
    #[error("indexing of {0} is still in flight")]
    Busy(ObjectId),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// Result alias for indexing operations.
pub type IndexResult<T> = Result<T, IndexError>;
