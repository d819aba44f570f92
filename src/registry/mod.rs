//! Service registry and composition-gated publishing.
//!
//! # Data Flow
//! ```text
//! push(graph@variant, service, url, sdl)
//!     → well-formedness gate (schema module)
//!     → retired-name gate
//!     → [variant gate] upsert descriptor
//!     → [variant gate] compose full set
//!         Ok  → new ComposedConfiguration → SnapshotStore::publish
//!         Err → errors to caller; registry upsert retained,
//!               previously published configuration stays active
//! ```
//!
//! # Design Decisions
//! - One compose-and-publish in flight per variant: pushes queue on the
//!   variant gate rather than interleave
//! - Check composes a cloned descriptor snapshot outside the gate; it can
//!   be abandoned mid-flight without side effects
//! - Deleted service names are retired at graph scope and never reusable
//! - A publish that cannot reach the store does not advance the published
//!   version; the descriptor upsert is still retained

pub mod core;
pub mod types;

pub use self::core::Registry;
pub use types::{
    valid_service_name, CheckOutcome, CheckRequest, DeleteOutcome, GraphRef, ParseGraphRefError,
    PushOutcome, PushRequest, RegistryError, ServiceDescriptor, ServiceSummary,
};
