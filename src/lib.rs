//! Federated Graph Registry Library
//!
//! Management core for a GraphQL federation platform: a service registry
//! with composition-gated publishing, a write-once snapshot distribution
//! store, and the gateway-side reconciliation loop that adopts published
//! configuration without dropping in-flight requests.

pub mod api;
pub mod composition;
pub mod config;
pub mod distribution;
pub mod gateway;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod resilience;
pub mod schema;

pub use config::{GatewayConfig, RegistryConfig};
pub use lifecycle::Shutdown;
pub use registry::{GraphRef, Registry};
