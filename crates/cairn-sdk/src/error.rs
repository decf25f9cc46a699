use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("registry root is not available")]
    RootUnavailable,

    #[error("schema not registered: {0}")]
    UnknownSchema(String),

    #[error("store error: {0}")]
    Store(#[from] cairn_store::StoreError),

    #[error("registry error: {0}")]
    Registry(#[from] cairn_registry::RegistryError),

    #[error("index error: {0}")]
    Index(#[from] cairn_index::IndexError),

    #[error(transparent)]
    Ops(#[from] cairn_ops::OpsError),

    #[error(transparent)]
    Seed(#[from] cairn_seed::SeedError),
}

pub type SdkResult<T> = Result<T, SdkError>;
