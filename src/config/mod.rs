//! Boot configuration for the registry server and the gateway.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, all errors collected)
//!     → RegistryConfig / GatewayConfig (validated, immutable)
//! ```
//!
//! Runtime configuration (the composed graph) never lives here: gateways
//! receive it through the distribution store, not through this file.
//!
//! # Design Decisions
//! - Config is immutable once loaded; boot config changes require restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_gateway_config, load_registry_config, ConfigError};
pub use schema::{
    AuthConfig, GatewayConfig, GatewayMode, ListenerConfig, ObservabilityConfig, PollConfig,
    PublishConfig, RegistryConfig, StaticServiceConfig, StorageBackend, StorageConfig,
};
pub use validation::{validate_gateway, validate_registry, ValidationError};
