//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files, with
//! defaults so a minimal config stays minimal.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the registry server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RegistryConfig {
    /// HTTP listener settings.
    pub listener: ListenerConfig,

    /// Credential expected from clients; also scopes the storage key.
    pub auth: AuthConfig,

    /// Snapshot store settings.
    pub storage: StorageConfig,

    /// Publish retry settings.
    pub publish: PublishConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Root configuration for a gateway instance.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Graph this gateway serves.
    pub graph: String,

    /// Variant (deployment track) within the graph.
    pub variant: String,

    /// Managed (poll the store) or static (fixed service list).
    pub mode: GatewayMode,

    /// Credential identifying the graph; must match the registry's.
    pub auth: AuthConfig,

    /// Snapshot store settings (managed mode).
    pub storage: StorageConfig,

    /// Poll/backoff tuning (managed mode).
    pub poll: PollConfig,

    /// Fixed service list (static mode).
    pub services: Vec<StaticServiceConfig>,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Gateway operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GatewayMode {
    /// Poll the distribution store for published snapshots.
    #[default]
    Managed,
    /// Compose a fixed service list at boot; no reconciliation.
    Static,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g. "0.0.0.0:4000").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Shared credential configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Bearer token clients present; hashed into the storage key scope.
    pub api_key: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: "registry-dev-key".to_string(),
        }
    }
}

/// Snapshot store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Store backend.
    pub backend: StorageBackend,

    /// Root directory for the file backend.
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            root: PathBuf::from("./var/snapshots"),
        }
    }
}

/// Snapshot store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Directory shared between registry and gateways.
    #[default]
    File,
    /// In-process store; single-process development and tests only.
    Memory,
}

/// Publish retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Attempts before a publish is given up (>= 1).
    pub max_attempts: u32,

    /// Base backoff delay between attempts in milliseconds.
    pub base_delay_ms: u64,

    /// Backoff cap in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
        }
    }
}

/// Reconciler poll tuning. A staleness/resource trade-off, never a
/// correctness parameter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollConfig {
    /// Seconds between polls of the distribution store.
    pub interval_secs: u64,

    /// Base backoff after a failed poll, in milliseconds.
    pub base_backoff_ms: u64,

    /// Backoff cap in milliseconds.
    pub max_backoff_ms: u64,

    /// Watch the pointer file (file backend) to poll ahead of the tick.
    pub watch_pointer: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            base_backoff_ms: 500,
            max_backoff_ms: 30_000,
            watch_pointer: true,
        }
    }
}

/// One fixed service in a static-mode gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticServiceConfig {
    /// Service name.
    pub name: String,

    /// Address query execution routes to.
    pub routing_url: String,

    /// Path to the service's SDL file.
    #[serde(default)]
    pub schema_path: Option<PathBuf>,

    /// Inline SDL; takes precedence over `schema_path`.
    #[serde(default)]
    pub schema: Option<String>,
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default tracing filter when RUST_LOG is unset.
    pub log_filter: String,

    /// Expose Prometheus metrics.
    pub metrics_enabled: bool,

    /// Metrics exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "graph_registry=info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
