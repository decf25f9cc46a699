use cairn_schema::SchemaError;
use cairn_store::StoreError;
use cairn_types::{ObjectId, TypeError};

/// Errors from registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The registry root exists but is not loaded locally, or the owning
    /// account is unavailable.
    #[error("registry root is not available")]
    RootUnavailable,

    /// The object is not a stored schema.
    #[error("object {0} is not a schema")]
    NotASchema(ObjectId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
