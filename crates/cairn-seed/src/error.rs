use cairn_index::IndexError;
use cairn_ops::OpsError;
use cairn_registry::RegistryError;
use cairn_schema::SchemaError;
use cairn_store::StoreError;
use cairn_types::{ObjectKind, TypeError};

/// Errors that abort a seed.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("invalid seed bundle: {0}")]
    InvalidBundle(String),

    #[error("registry root is not available")]
    RootUnavailable,

    /// A schema shape names schemas that neither the bundle nor the
    /// registry defines.
    #[error("schema {schema} references unknown schemas: {}", .missing.join(", "))]
    UnresolvedReferences { schema: String, missing: Vec<String> },

    /// A registered schema would change kind; stored objects cannot.
    #[error("schema {name} is stored as a {stored}, bundle declares a {requested}")]
    KindChanged {
        name: String,
        stored: ObjectKind,
        requested: ObjectKind,
    },

    /// A config or data record failed while halting on record errors.
    #[error("seeding {key} failed: {source}")]
    Record {
        key: String,
        #[source]
        source: OpsError,
    },

    #[error("ops error: {0}")]
    Ops(#[from] OpsError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

pub type SeedResult<T> = Result<T, SeedError>;
