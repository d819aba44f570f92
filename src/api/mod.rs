//! Registry HTTP surface.
//!
//! # Responsibilities
//! - Expose push/check/delete/list as JSON endpoints
//! - Gate every registry route behind the graph credential
//! - Wire middleware (request ID, tracing, timeout)
//!
//! # Design Decisions
//! - The HTTP layer is a thin adapter: outcome enums serialize as-is, and
//!   registry errors map onto status codes in one place
//! - `/status` stays unauthenticated for load-balancer probes

pub mod auth;
pub mod handlers;
pub mod server;

pub use server::{AppState, RegistryServer};
