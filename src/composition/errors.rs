//! Composition and usage error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A reason the partial schemas of a variant cannot be merged.
///
/// Every variant carries the service (and where applicable the type and
/// field) so a caller can localize the offending submission.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum CompositionError {
    /// Two services both claim ownership of the same type.
    #[error("type `{type_name}` is defined by both `{first}` and `{second}`")]
    DuplicateTypeOwnership {
        type_name: String,
        first: String,
        second: String,
    },

    /// A service extends a type no service defines.
    #[error("service `{service}` extends `{type_name}`, which no service defines")]
    UnresolvedExtension { service: String, type_name: String },

    /// A field references a type no service defines.
    #[error("field `{type_name}.{field}` in service `{service}` references unknown type `{referenced}`")]
    UnresolvedFieldType {
        service: String,
        type_name: String,
        field: String,
        referenced: String,
    },

    /// The same field is contributed by two services.
    #[error("field `{type_name}.{field}` is contributed by both `{first}` and `{second}`")]
    FieldConflict {
        type_name: String,
        field: String,
        first: String,
        second: String,
    },

    /// No service defines the `Query` root.
    #[error("no service defines the `Query` root type")]
    MissingQueryRoot,

    /// A stored partial schema no longer scans. Pushes validate schemas
    /// before they are admitted, so this indicates registry corruption.
    #[error("service `{service}` holds an invalid partial schema: {detail}")]
    InvalidPartialSchema { service: String, detail: String },
}

/// A change that composes but would break a recorded client operation.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("operation `{operation}` selects `{type_name}.{field}`, which the candidate schema no longer provides")]
pub struct UsageFailure {
    pub operation: String,
    pub type_name: String,
    pub field: String,
}
