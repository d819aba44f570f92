//! Registry data model and operation results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::composition::{CompositionError, UsageFailure};
use crate::distribution::DistributionError;
use crate::schema::SchemaError;

/// A (graph, variant) pair: one named deployment track of a federated graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphRef {
    pub graph: String,
    pub variant: String,
}

/// Variant assumed when a graph ref is written without one.
pub const DEFAULT_VARIANT: &str = "current";

impl GraphRef {
    pub fn new(graph: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            graph: graph.into(),
            variant: variant.into(),
        }
    }
}

impl fmt::Display for GraphRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.graph, self.variant)
    }
}

/// Error parsing a `graph[@variant]` reference.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid graph ref `{0}`: expected `graph` or `graph@variant`")]
pub struct ParseGraphRefError(pub String);

impl FromStr for GraphRef {
    type Err = ParseGraphRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('@');
        let graph = parts.next().unwrap_or_default();
        let variant = parts.next().unwrap_or(DEFAULT_VARIANT);
        if graph.is_empty() || variant.is_empty() || parts.next().is_some() {
            return Err(ParseGraphRefError(s.to_string()));
        }
        Ok(GraphRef::new(graph, variant))
    }
}

/// One federated service's registered state: identity, runtime address, and
/// partial schema. Replaced wholesale by a successful push, never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    pub routing_url: String,
    pub schema_sdl: String,
}

/// Names acceptable for services, graphs, and variants.
///
/// Doubles as a path-safety gate: these strings become storage directories.
pub fn valid_service_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Push input: the service's declared identity, address, and schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushRequest {
    pub service: String,
    pub routing_url: String,
    pub schema: String,
}

/// Check input: a candidate schema for a (possibly new) service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequest {
    pub service: String,
    pub schema: String,
}

/// Result of a push that passed the input gates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PushOutcome {
    /// Composition succeeded and a new snapshot is published.
    Published { version: u64, id: Uuid },

    /// Composition failed. The descriptor upsert is retained; the
    /// previously published configuration (if any) remains active.
    CompositionFailed {
        errors: Vec<CompositionError>,
        active_version: Option<u64>,
    },
}

/// Result of a check. Never mutates anything, regardless of outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Candidate composes and breaks no recorded operation.
    Pass { operations_checked: usize },

    /// The schema set cannot be merged at all.
    CompositionFailed { errors: Vec<CompositionError> },

    /// Composition succeeds but recorded client operations would break.
    UsageFailed { failures: Vec<UsageFailure> },
}

/// Result of a delete that found its service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// Remaining services recomposed; a new snapshot is published.
    Published { version: u64, id: Uuid },

    /// Remaining services no longer compose; the previously published
    /// configuration remains active.
    CompositionFailed {
        errors: Vec<CompositionError>,
        active_version: Option<u64>,
    },

    /// The last service was removed; nothing left to compose.
    Emptied { active_version: Option<u64> },
}

/// Summary row returned by `list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub name: String,
    pub routing_url: String,
    /// Digest of the registered partial schema.
    pub schema_sha256: String,
}

/// Errors that reject an operation before or during registry mutation.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Graph or variant component fails the identifier rules.
    #[error("invalid graph ref `{0}`: graph and variant must be identifiers")]
    InvalidGraphRef(String),

    /// Service name fails the identifier rules.
    #[error("invalid service name `{0}`")]
    InvalidServiceName(String),

    /// Partial schema rejected in isolation; nothing was mutated.
    #[error("schema for service `{service}` is malformed: {source}")]
    MalformedSchema {
        service: String,
        #[source]
        source: SchemaError,
    },

    /// Routing URL does not parse.
    #[error("routing url `{url}` is invalid: {source}")]
    InvalidRoutingUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The name was deleted from this graph; reuse is forbidden.
    #[error("service name `{0}` was deleted from this graph and cannot be reused")]
    NameRetired(String),

    /// Delete target does not exist.
    #[error("service `{service}` is not registered in `{graph_ref}`")]
    UnknownService { service: String, graph_ref: String },

    /// Composition succeeded but the snapshot could not be published. The
    /// descriptor upsert is retained; the published version did not advance.
    #[error("failed to publish configuration snapshot: {0}")]
    Distribution(#[from] DistributionError),
}
