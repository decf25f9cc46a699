use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid object id {0:?}: expected co_ followed by 64 hex characters")]
    InvalidObjectId(String),

    #[error("invalid schema name {name:?}: {reason}")]
    InvalidSchemaName { name: String, reason: String },

    #[error("unknown object kind: {0}")]
    UnknownKind(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),
}
