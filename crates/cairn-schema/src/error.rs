use cairn_types::TypeError;

use crate::validate::Violation;

/// Errors from schema parsing and validation.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A shape could not be parsed.
    #[error("invalid shape at {path}: {reason}")]
    InvalidShape { path: String, reason: String },

    /// A schema definition is missing fields or has the wrong types.
    #[error("invalid schema definition: {0}")]
    InvalidDefinition(String),

    /// Data does not satisfy a schema.
    #[error("data does not match schema {schema}: {}", join_violations(.violations))]
    Validation {
        schema: String,
        violations: Vec<Violation>,
    },

    /// Malformed schema name or object ID.
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl SchemaError {
    pub(crate) fn shape(path: &str, reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            path: if path.is_empty() { "/".into() } else { path.into() },
            reason: reason.into(),
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result alias for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;
