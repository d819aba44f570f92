//! Partial schema model and well-formedness checking.
//!
//! # Responsibilities
//! - Scan SDL source into a structural model (types, extensions, fields)
//! - Reject malformed documents before they reach the registry
//! - Provide the type/field index consumed by composition and usage checks
//!
//! # Design Decisions
//! - Lightweight scanner, not a full GraphQL parser: enough structure for
//!   composition gating; argument types and directives are skipped
//! - Malformed input is rejected with the first structural error; semantic
//!   cross-service errors are composition's job
//! - Model is immutable once parsed

pub mod sdl;

pub use sdl::{parse_partial, FieldDef, PartialSchema, SchemaError, TypeDef, TypeKind};

/// Scalars every schema can reference without defining.
pub const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

/// Whether `name` is a built-in scalar.
pub fn is_builtin_scalar(name: &str) -> bool {
    BUILTIN_SCALARS.contains(&name)
}
