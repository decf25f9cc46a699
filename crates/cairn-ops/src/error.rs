use cairn_index::IndexError;
use cairn_registry::RegistryError;
use cairn_schema::SchemaError;
use cairn_store::StoreError;
use cairn_types::{ObjectId, ObjectKind};

use crate::expr::EvalError;

/// Errors from CRUD operations.
#[derive(Debug, thiserror::Error)]
pub enum OpsError {
    /// A schema name was given where an object ID is required.
    #[error("schema reference {0:?} must be an object ID outside seeding")]
    SymbolicSchemaRef(String),

    /// Neither an object ID nor a namespaced schema name.
    #[error("invalid schema reference {0:?}")]
    InvalidSchemaRef(String),

    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    #[error("object not found: {0}")]
    NotFound(ObjectId),

    /// The object's header carries no schema reference.
    #[error("object {0} has no schema")]
    NoSchema(ObjectId),

    /// Partial update data tried to name a schema.
    #[error("update data must not contain \"$schema\"; the schema comes from the object header")]
    SchemaHintRejected,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("object {id} is a {actual}, expected a {expected}")]
    KindMismatch {
        id: ObjectId,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    /// The schema has no index list to read.
    #[error("schema {0} is not indexed")]
    NotIndexed(ObjectId),

    /// Data failed validation; names the operation and the schema.
    #[error("{op} rejected by schema {schema}: {source}")]
    Validation {
        op: &'static str,
        schema: String,
        #[source]
        source: SchemaError,
    },

    #[error("timed out waiting for {0} to persist")]
    DurabilityTimeout(ObjectId),

    /// The store dropped a live value's channel.
    #[error("subscription to {0} closed")]
    Closed(ObjectId),

    #[error("expression error: {0}")]
    Eval(#[from] EvalError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// Result alias for CRUD operations.
pub type OpsResult<T> = Result<T, OpsError>;
