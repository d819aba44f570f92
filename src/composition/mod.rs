//! Schema composition subsystem.
//!
//! # Data Flow
//! ```text
//! registry descriptor set
//!     → Composer::compose (injected, pure, deterministic)
//!     → Ok(ComposedSchema)  → new configuration snapshot
//!     → Err(errors)         → push/check caller; nothing published
//!
//! check only:
//!     ComposedSchema × OperationCorpus → usage failures
//! ```
//!
//! # Design Decisions
//! - The federation composition algorithm itself is out of scope; only its
//!   success/failure contract matters here, so `Composer` is a trait object
//!   seam with a structural default implementation
//! - Composition collects every error, not just the first, with enough
//!   detail to localize the offending service and field
//! - The client-operation corpus is an external collaborator behind
//!   `OperationCorpus`; usage checks never mutate anything

pub mod compose;
pub mod errors;
pub mod usage;

pub use compose::{ComposedSchema, Composer, MergedField, MergedType, StructuralComposer};
pub use errors::{CompositionError, UsageFailure};
pub use usage::{usage_failures, FieldUse, NullCorpus, OperationCorpus, RecordedOperation, StaticCorpus};
